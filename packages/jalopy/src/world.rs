//! The game world and its per-frame systems.
//!
//! [`World::frame`] runs the original arcade loop: advance the spring webs, spin and
//! drive the wheels, collect letters, collide with platforms, apply gravity, bounce off
//! the view borders, scroll the view, and recycle whatever has fallen behind it. The
//! order matters; several systems deliberately write straight into dot positions,
//! velocities, and rendering angles between integrator steps.

use crate::{
    frame_clock::Tick,
    platform::{
        Platform,
        PLATFORM_BOUNCE,
        PLATFORM_SPEED,
        PLATFORM_STICK,
    },
    scene::{
        self,
        DOT_CAPACITY,
    },
    wheel::{
        below_drive_cap,
        Support,
        Wheel,
        MAX_WHEEL_FORCE,
        WHEEL_DRIVE_ARM_FACTOR,
        WHEEL_GYRATION_FACTOR,
    },
};
use dotweb::{prepare, step, Node};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;


pub const N_WHEELS: usize = 2;
pub const N_PLATFORMS: usize = 15;
pub const GRAVITY: f64 = 7e2;
pub const ALPHABET: usize = 26;


pub struct World {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) dot_size: f64,
    pub(crate) dots: Vec<Node>,
    pub(crate) n_car_dots: usize,
    pub(crate) i_letter_dots: usize,
    pub(crate) wheels: [Wheel; N_WHEELS],
    pub(crate) platforms: Vec<Platform>,
    pub(crate) alien_letters: Vec<usize>,
    pub(crate) have_letters: [bool; ALPHABET],
    pub(crate) view_x: f64,
    pub(crate) wheel_force: f64,
    pub(crate) rng: Pcg64Mcg,
    initial: WorldSnapshot,
}

/// Everything that moves, for the driver to stash and restore. Arena layout (which
/// dots are car, wheels, letters) is fixed at construction and not part of it.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    dots: Vec<Node>,
    wheels: [Wheel; N_WHEELS],
    platforms: Vec<Platform>,
    alien_letters: Vec<usize>,
    have_letters: [bool; ALPHABET],
    view_x: f64,
    wheel_force: f64,
    rng: Pcg64Mcg,
}

impl World {
    /// Build the whole scene: car, then the one and only `prepare` over the car dots,
    /// then aliens appended behind the integrator's back so their zero rest bearings
    /// survive. Platforms start as inert zero slabs and only spawn once the view has
    /// scrolled past them.
    pub fn new(width: f64, height: f64, dot_size: f64, seed: u64) -> Self {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut dots = Vec::with_capacity(DOT_CAPACITY);
        scene::build_car(&mut dots, &mut rng, dot_size, height);
        prepare(&mut dots);
        let n_car_dots = dots.len();

        let (i_letter_dots, alien_letters) =
            match scene::append_aliens(&mut dots, &mut rng, width, dot_size) {
                Some(aliens) => (aliens.i_letter_dots, aliens.letters),
                None => (dots.len(), Vec::new()),
            };
        info!(dots = dots.len(), seed, "built world");

        let platforms = vec![Platform::default(); N_PLATFORMS];
        let initial = WorldSnapshot {
            dots: dots.clone(),
            wheels: [Wheel::default(); N_WHEELS],
            platforms: platforms.clone(),
            alien_letters: alien_letters.clone(),
            have_letters: [false; ALPHABET],
            view_x: 0.0,
            wheel_force: 0.0,
            rng: rng.clone(),
        };
        World {
            width,
            height,
            dot_size,
            dots,
            n_car_dots,
            i_letter_dots,
            wheels: initial.wheels,
            platforms,
            alien_letters,
            have_letters: initial.have_letters,
            view_x: 0.0,
            wheel_force: 0.0,
            rng,
            initial,
        }
    }

    /// Advance one frame. The platform push deliberately runs on the raw measured time
    /// step while everything else runs on the admitted one.
    pub fn frame(&mut self, tick: Tick) {
        step(&mut self.dots, tick.dt);
        self.wheels_step(tick.dt);
        self.letters_step();
        self.platforms_step(tick.raw_dt);
        self.gravity_step(tick.dt);
        self.view_border_step();
        self.view_scroll_step();
        self.world_cycle();
    }

    /// Set the constant throttle, clamped to the drive force range.
    pub fn set_wheel_force(&mut self, force: f64) {
        self.wheel_force = force.clamp(-MAX_WHEEL_FORCE, MAX_WHEEL_FORCE);
    }

    pub fn view_x(&self) -> f64 {
        self.view_x
    }

    /// Midpoint of the two wheel dots; what the view chases.
    pub fn wheel_midpoint(&self) -> f64 {
        0.5 * (self.dots[0].pos.x + self.dots[1].pos.x)
    }

    pub fn letters_collected(&self) -> usize {
        self.have_letters.iter().filter(|&&have| have).count()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            dots: self.dots.clone(),
            wheels: self.wheels,
            platforms: self.platforms.clone(),
            alien_letters: self.alien_letters.clone(),
            have_letters: self.have_letters,
            view_x: self.view_x,
            wheel_force: self.wheel_force,
            rng: self.rng.clone(),
        }
    }

    /// Rewind to the exact post-construction state, before any frames ran.
    pub fn reset(&mut self) {
        let initial = self.initial.clone();
        self.restore(&initial);
    }

    /// Rewind to a snapshot. With the same subsequent ticks the world replays the
    /// exact same trajectory.
    pub fn restore(&mut self, snapshot: &WorldSnapshot) {
        self.dots = snapshot.dots.clone();
        self.wheels = snapshot.wheels;
        self.platforms = snapshot.platforms.clone();
        self.alien_letters = snapshot.alien_letters.clone();
        self.have_letters = snapshot.have_letters;
        self.view_x = snapshot.view_x;
        self.wheel_force = snapshot.wheel_force;
        self.rng = snapshot.rng.clone();
    }

    fn wheels_step(&mut self, dt: f64) {
        for i in 0..N_WHEELS {
            self.wheel_rotation(i, dt);
        }
    }

    fn wheel_rotation(&mut self, i: usize, dt: f64) {
        let dot = &mut self.dots[i];
        let wheel = &mut self.wheels[i];

        match wheel.support {
            Support::Ground => {
                if dot.pos.y + dot.radius < self.height - self.dot_size * PLATFORM_STICK {
                    wheel.support = Support::None;
                }
            }
            Support::Platform(j) => {
                let p = &self.platforms[j];
                if p.on_height(dot) > p.height + self.dot_size * PLATFORM_STICK {
                    wheel.support = Support::None;
                }
            }
            Support::None => {}
        }

        if wheel.support != Support::None {
            // rolling without slip, so spin is read off the dot
            wheel.spin_vel = dot.vel.x / dot.radius;
            if below_drive_cap(self.wheel_force, dot.vel.x, self.dot_size) {
                dot.vel.x += dot.radius * self.wheel_force * dt / dot.mass;
                dot.angle -= self.wheel_force * WHEEL_DRIVE_ARM_FACTOR;
            }
        } else if below_drive_cap(self.wheel_force, wheel.spin_vel * dot.radius, self.dot_size) {
            wheel.spin_vel += self.wheel_force * dt / (dot.mass * WHEEL_GYRATION_FACTOR);
        }
        wheel.spin += wheel.spin_vel * dt;
    }

    fn letters_step(&mut self) {
        for i in self.i_letter_dots..self.dots.len() {
            let u = self.alien_letters[i - self.i_letter_dots];
            if self.have_letters[u] {
                continue;
            }
            let letter_dot = &self.dots[i];
            let catcher = &self.dots[self.n_car_dots - 1];
            if (catcher.pos - letter_dot.pos).magnitude() < self.dot_size * 3.0 {
                self.have_letters[u] = true;
                let glyph = (b'A' + u as u8) as char;
                info!(%glyph, "collected a letter");
            }
        }
    }

    /// Only wheels and letter dots collide with platforms; car body and alien body
    /// dots pass through. Per dot the platform closest to releasing it wins, and the
    /// push is proportional to that remaining climb.
    fn platforms_step(&mut self, raw_dt: f64) {
        for i in 0..self.dots.len() {
            if i >= N_WHEELS && i < self.i_letter_dots {
                continue;
            }
            let dot = &self.dots[i];
            let mut h_on = 0.0;
            let mut j_on = 0;
            for (j, p) in self.platforms.iter().enumerate() {
                let h = p.on_height(dot);
                if h < p.height && h > h_on {
                    h_on = h;
                    j_on = j;
                }
            }
            if h_on > 0.0 {
                self.platforms[j_on].bounce(&mut self.dots[i], h_on * raw_dt * PLATFORM_SPEED);
                if i < N_WHEELS {
                    self.wheels[i].support = Support::Platform(j_on);
                }
            }
        }
    }

    fn gravity_step(&mut self, dt: f64) {
        for dot in &mut self.dots {
            if dot.pos.y < self.height - dot.radius {
                dot.vel.y += GRAVITY * dt;
            }
        }
    }

    fn view_border_step(&mut self) {
        for i in 0..self.n_car_dots {
            let dot = &mut self.dots[i];
            if dot.vel.x < 0.0 && dot.pos.x < self.view_x + dot.radius {
                dot.vel.x *= -PLATFORM_BOUNCE;
                dot.pos.x = self.view_x + dot.radius;
            }
            if dot.vel.y > 0.0 && dot.pos.y > self.height - dot.radius {
                dot.vel.y *= -PLATFORM_BOUNCE;
                dot.pos.y = self.height - dot.radius;
                if i < N_WHEELS {
                    self.wheels[i].support = Support::Ground;
                }
            }
        }
    }

    fn view_scroll_step(&mut self) {
        if self.dots.is_empty() {
            return;
        }
        let x = self.wheel_midpoint();
        let q = self.width * 0.5;
        if x > self.view_x + q {
            self.view_x = x - q;
        }
    }

    fn world_cycle(&mut self) {
        for i in 0..self.platforms.len() {
            if self.platforms[i].right.x < self.view_x {
                self.platforms[i] = Platform::spawn_ahead(
                    &mut self.rng,
                    self.view_x,
                    self.width,
                    self.height,
                    self.dot_size,
                );
                debug!(slot = i, "recycled a platform ahead of the view");
            }
        }
        for i in self.i_letter_dots..self.dots.len() {
            let behind = self.dots[i].pos.x < self.view_x - self.width * 0.5;
            let below = self.dots[i].pos.y > self.height * 1.5;
            if behind || below {
                let slot = i - self.i_letter_dots;
                scene::alien_cycle(
                    &mut self.dots,
                    &mut self.rng,
                    &mut self.alien_letters[slot],
                    i,
                    self.view_x,
                    self.width,
                    self.dot_size,
                );
                debug!(slot, "recycled an alien ahead of the view");
            }
        }
    }
}


#[cfg(test)]
use vek::*;

#[cfg(test)]
fn test_world() -> World {
    World::new(960.0, 540.0, 27.0, 1)
}

#[cfg(test)]
const TICK_60: Tick = Tick {
    dt: 1.0 / 60.0,
    raw_dt: 1.0 / 60.0,
};

#[test]
fn test_same_seed_worlds_march_in_lockstep() {
    let mut a = World::new(960.0, 540.0, 27.0, 42);
    let mut b = World::new(960.0, 540.0, 27.0, 42);
    a.set_wheel_force(0.8);
    b.set_wheel_force(0.8);
    for _ in 0..200 {
        a.frame(TICK_60);
        b.frame(TICK_60);
    }
    assert_eq!(a.dots, b.dots);
    assert_eq!(a.view_x, b.view_x);
    assert_eq!(a.have_letters, b.have_letters);
}

#[test]
fn test_restore_rewinds_the_trajectory() {
    let mut w = test_world();
    w.set_wheel_force(0.8);
    let snapshot = w.snapshot();

    for _ in 0..150 {
        w.frame(TICK_60);
    }
    let first_run_dots = w.dots.clone();
    let first_run_view = w.view_x;

    w.restore(&snapshot);
    for _ in 0..150 {
        w.frame(TICK_60);
    }
    assert_eq!(w.dots, first_run_dots);
    assert_eq!(w.view_x, first_run_view);
}

#[test]
fn test_reset_rewinds_to_post_construction_state() {
    let mut w = test_world();
    let pristine = w.dots.clone();
    w.set_wheel_force(0.8);
    for _ in 0..25 {
        w.frame(TICK_60);
    }
    assert_ne!(w.dots, pristine);

    w.reset();
    assert_eq!(w.dots, pristine);
    assert_eq!(w.view_x, 0.0);
    assert_eq!(w.wheel_force, 0.0);
    assert_eq!(w.letters_collected(), 0);
}

#[test]
fn test_gravity_only_pulls_airborne_dots() {
    let mut w = test_world();
    w.dots[2].pos = Vec2::new(100.0, 100.0);
    w.dots[2].vel = Vec2::zero();
    w.dots[0].pos.y = w.height - w.dots[0].radius;
    w.dots[0].vel = Vec2::zero();

    w.gravity_step(0.1);
    assert_eq!(w.dots[2].vel.y, 70.0);
    assert_eq!(w.dots[0].vel.y, 0.0);
}

#[test]
fn test_border_bounce_reflects_and_grounds() {
    let mut w = test_world();
    w.dots[0].pos = Vec2::new(w.view_x + 1.0, w.height + 5.0);
    w.dots[0].vel = Vec2::new(-5.0, 10.0);

    w.view_border_step();
    let r = w.dots[0].radius;
    assert_eq!(w.dots[0].vel, Vec2::new(2.5, -5.0));
    assert_eq!(w.dots[0].pos, Vec2::new(w.view_x + r, w.height - r));
    assert_eq!(w.wheels[0].support, Support::Ground);
}

#[test]
fn test_grounded_wheel_drives_and_kicks_back() {
    let mut w = test_world();
    w.wheel_force = 1.0;
    w.wheels[0].support = Support::Ground;
    w.dots[0].pos.y = w.height - w.dots[0].radius;
    w.dots[0].vel = Vec2::zero();
    w.dots[0].angle = 0.0;

    w.wheel_rotation(0, 0.01);
    let dot = &w.dots[0];
    assert_eq!(w.wheels[0].support, Support::Ground);
    assert_eq!(w.wheels[0].spin_vel, 0.0);
    let expect = dot.radius * 1.0 * 0.01 / dot.mass;
    assert!((dot.vel.x - expect).abs() < 1e-12);
    assert_eq!(dot.angle, -1.0);
}

#[test]
fn test_overspeed_wheel_gets_no_drive() {
    let mut w = test_world();
    w.wheel_force = 1.0;
    w.wheels[0].support = Support::Ground;
    w.dots[0].pos.y = w.height - w.dots[0].radius;
    w.dots[0].vel = Vec2::new(10.0 * w.dot_size, 0.0);
    w.dots[0].angle = 0.0;

    w.wheel_rotation(0, 0.01);
    assert_eq!(w.dots[0].vel.x, 10.0 * w.dot_size);
    assert_eq!(w.dots[0].angle, 0.0);
    // still rolls without slip
    assert_eq!(w.wheels[0].spin_vel, 10.0 * w.dot_size / w.dots[0].radius);
}

#[test]
fn test_lifted_wheel_releases_and_freewheels() {
    let mut w = test_world();
    w.wheel_force = 1.0;
    w.wheels[0].support = Support::Ground;
    w.dots[0].pos.y = 100.0;
    w.dots[0].vel = Vec2::zero();
    w.wheels[0].spin_vel = 0.0;

    w.wheel_rotation(0, 0.01);
    assert_eq!(w.wheels[0].support, Support::None);
    // throttle spins the free wheel instead of driving the dot
    assert_eq!(w.dots[0].vel.x, 0.0);
    let expect = 1.0 * 0.01 / (w.dots[0].mass * WHEEL_GYRATION_FACTOR);
    assert!((w.wheels[0].spin_vel - expect).abs() < 1e-12);
    assert!((w.wheels[0].spin - expect * 0.01).abs() < 1e-15);
}

#[test]
fn test_platform_contact_supports_wheel_and_skips_body() {
    let mut w = test_world();
    // round radius keeps the contact arithmetic exact
    w.dots[0].radius = 25.0;
    let x = w.dots[0].pos.x;
    // slab underside at y = 300, wheel's bottom edge 2 into the contact band
    w.platforms[3] = Platform::new(
        Vec2::new(x - 50.0, 300.0),
        Vec2::new(x + 50.0, 300.0),
        5.0,
    );
    w.dots[0].pos.y = 300.0 - 25.0 - 2.0;
    w.dots[0].vel = Vec2::new(0.0, 5.0);
    // park the body dot inside the same band; it must pass through
    let body_r = w.dots[2].radius;
    w.dots[2].pos = Vec2::new(x, 300.0 - body_r - 2.0);
    w.dots[2].vel = Vec2::new(0.0, 5.0);

    w.platforms_step(0.01);
    assert_eq!(w.wheels[0].support, Support::Platform(3));
    assert_eq!(w.dots[0].vel, Vec2::new(0.0, -2.5));
    assert_eq!(w.dots[0].pos.y, 273.0 - 2.0 * 0.01 * PLATFORM_SPEED);
    assert_eq!(w.dots[2].vel, Vec2::new(0.0, 5.0));
}

#[test]
fn test_letter_collected_only_within_reach() {
    let mut w = test_world();
    assert_eq!(w.letters_collected(), 0);

    // park one letter dot just out of reach of the last car dot
    let catcher = w.dots[w.n_car_dots - 1].pos;
    w.dots[13].pos = catcher + Vec2::new(w.dot_size * 3.0 + 1.0, 0.0);
    w.letters_step();
    assert_eq!(w.letters_collected(), 0);

    w.dots[13].pos = catcher + Vec2::new(w.dot_size * 2.0, 0.0);
    w.letters_step();
    let u = w.alien_letters[0];
    assert!(w.have_letters[u]);
    assert_eq!(w.letters_collected(), 1);
}

#[test]
fn test_alien_recycles_when_left_behind() {
    let mut w = test_world();
    w.view_x = 3000.0;
    w.dots[13].pos.x = w.view_x - w.width;

    w.world_cycle();
    assert!(w.dots[13].pos.x > w.view_x + w.width);
    assert!(w.dots[13].pos.y < 10.0);
    assert!(w.alien_letters[0] < ALPHABET);
    // chain re-spaced top to bottom
    assert_eq!(w.dots[13].springs[0].rest_length(), w.dot_size * 2.0);
    assert_eq!(w.dots[4].springs[0].rest_length(), w.dot_size * 2.0);
    assert!(w.dots[13].pos.y < w.dots[4].pos.y);
    assert!(w.dots[4].pos.y < w.dots[3].pos.y);
}

#[test]
fn test_platforms_recycle_ahead_of_the_view() {
    let mut w = test_world();
    w.view_x = 5000.0;

    w.world_cycle();
    for p in &w.platforms {
        assert!(p.left.x >= w.view_x + w.width);
        assert!(p.right.x > p.left.x);
        assert!(p.height > 0.0);
    }
}

#[test]
fn test_view_scrolls_right_only() {
    let mut w = test_world();
    w.dots[0].pos.x = 2000.0;
    w.dots[1].pos.x = 2200.0;
    w.view_scroll_step();
    assert_eq!(w.view_x, 2100.0 - 480.0);

    w.dots[0].pos.x = 100.0;
    w.dots[1].pos.x = 200.0;
    w.view_scroll_step();
    assert_eq!(w.view_x, 2100.0 - 480.0);
}

#[test]
fn test_throttle_is_clamped() {
    let mut w = test_world();
    w.set_wheel_force(99.0);
    assert_eq!(w.wheel_force, MAX_WHEEL_FORCE);
    w.set_wheel_force(-99.0);
    assert_eq!(w.wheel_force, -MAX_WHEEL_FORCE);
}

#[test]
fn test_throttled_car_makes_rightward_progress() {
    let mut w = World::new(960.0, 540.0, 27.0, 0xcafef00dd15ea5e5);
    w.set_wheel_force(0.8 * MAX_WHEEL_FORCE);
    let start = w.wheel_midpoint();

    for _ in 0..60 * 30 {
        w.frame(TICK_60);
    }

    for dot in &w.dots {
        assert!(dot.pos.x.is_finite() && dot.pos.y.is_finite());
        assert!(dot.vel.x.is_finite() && dot.vel.y.is_finite());
        assert!(dot.angle.is_finite());
    }
    assert!(w.wheel_midpoint() > start + w.width);
    assert!(w.view_x > 0.0);
}
