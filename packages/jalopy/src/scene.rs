//! Spring-web scene construction: the two-wheeled car and the dangling alien chains.
//!
//! Every mass and stiffness is jittered by [`vary`] as it is created, so no two worlds
//! drive quite the same; a dot's radius follows from its mass so heavier dots look
//! heavier. Springs always aim from a higher dot index at a lower one. The integrator
//! walks indices downward, so that ordering is what keeps trajectories deterministic,
//! and [`link`] enforces it.

use crate::world::ALPHABET;
use dotweb::{add_spring, Node};
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use vek::*;


pub const DEFAULT_K: f64 = 1.0;
/// Rotational stiffness per unit of linear stiffness.
pub const ARM_K_FACTOR: f64 = 1e3;
pub const MIN_K: f64 = DEFAULT_K * 0.25;
pub const DEFAULT_MASS: f64 = 5e-3;
pub const MIN_MASS: f64 = DEFAULT_MASS * 0.25;
/// Fixed dot arena capacity.
pub const DOT_CAPACITY: usize = 24;

const N_ALIENS: usize = 5;
const N_ALIEN_BODY: usize = 2;


/// Random tuning jitter, uniform in [0.8, 1.2).
pub fn vary(rng: &mut Pcg64Mcg) -> f64 {
    0.8 + 0.4 * rng.gen::<f64>()
}

/// Display radius for a dot of the given mass.
pub fn dot_radius(dot_size: f64, mass: f64) -> f64 {
    dot_size * (mass / DEFAULT_MASS).sqrt()
}

/// Append a dot of roughly the given mass.
pub fn new_dot(dots: &mut Vec<Node>, rng: &mut Pcg64Mcg, dot_size: f64, pos: Vec2<f64>, mass: f64) {
    let mass = mass * vary(rng);
    let radius = dot_radius(dot_size, mass);
    dots.push(Node::new(pos, radius, mass));
}

/// Link two dots with a spring of roughly the given stiffness and the matching
/// rotational stiffness.
pub fn link_with(dots: &mut [Node], rng: &mut Pcg64Mcg, from: usize, to: usize, k: f64) {
    let k = k * vary(rng);
    add_spring(dots, from, to, k, ARM_K_FACTOR * k);
}

/// Link two dots at default stiffness, refusing a spring that does not aim at a lower
/// index.
pub fn link(dots: &mut [Node], rng: &mut Pcg64Mcg, from: usize, to: usize) {
    if from <= to {
        warn!(from, to, "spring must aim at a lower dot index, dropping link");
        return;
    }
    link_with(dots, rng, from, to, DEFAULT_K);
}

/// Build the car: two wheel dots on the floor and a lighter body dot slung above and
/// between them on weak springs.
pub fn build_car(dots: &mut Vec<Node>, rng: &mut Pcg64Mcg, dot_size: f64, height: f64) {
    let h = 2.0 * dot_size;
    new_dot(dots, rng, dot_size, Vec2::new(h, height - h), DEFAULT_MASS);
    new_dot(dots, rng, dot_size, Vec2::new(h * 3.0, height - h), DEFAULT_MASS);
    let body_x = h * (1.0 + vary(rng));
    new_dot(dots, rng, dot_size, Vec2::new(body_x, height - h * 1.5), MIN_MASS);
    link(dots, rng, 1, 0);
    link_with(dots, rng, 2, 1, MIN_K);
    link_with(dots, rng, 2, 0, MIN_K);
}

/// Where the aliens landed in the dot arena.
pub struct Aliens {
    /// Index of the first letter dot; everything from here up is a letter dot.
    pub i_letter_dots: usize,
    /// Current letter of each alien, reassigned on every cycle.
    pub letters: Vec<usize>,
}

/// Append the alien chains: each one letter dot hanging a chain of body dots under it.
/// All their dots are created coincident and immediately cycled to a spot ahead of the
/// view; the springs therefore carry zero rest bearings, which is what makes a chain
/// wriggle forever instead of settling. Returns `None` without appending anything if
/// the arena would overflow.
pub fn append_aliens(
    dots: &mut Vec<Node>,
    rng: &mut Pcg64Mcg,
    width: f64,
    dot_size: f64,
) -> Option<Aliens> {
    let n = dots.len() + N_ALIENS * (1 + N_ALIEN_BODY);
    if n >= DOT_CAPACITY {
        warn!(need = n, cap = DOT_CAPACITY, "no room for aliens in the dot arena");
        return None;
    }
    let i_letter_dots = n - N_ALIENS;
    while dots.len() < n {
        new_dot(dots, rng, dot_size, Vec2::zero(), DEFAULT_MASS);
    }

    let mut letters = vec![0; N_ALIENS];
    let mut j = i_letter_dots;
    let mut i = n;
    while i > i_letter_dots {
        i -= 1;
        j -= 1;
        link(dots, rng, i, j);
        for _ in 1..N_ALIEN_BODY {
            link(dots, rng, j, j - 1);
            j -= 1;
        }
        alien_cycle(dots, rng, &mut letters[i - i_letter_dots], i, 0.0, width, dot_size);
    }
    Some(Aliens { i_letter_dots, letters })
}

/// Re-home an alien: roll a fresh letter, drop the chain just past the right edge of
/// the view at the top of the world, and re-space every link in the chain. Rest
/// lengths are rewritten on each cycle; rest bearings are left alone.
pub fn alien_cycle(
    dots: &mut [Node],
    rng: &mut Pcg64Mcg,
    letter: &mut usize,
    i: usize,
    view_x: f64,
    width: f64,
    dot_size: f64,
) {
    *letter = rng.gen_range(0..ALPHABET);
    let x = view_x + (1.0 + rng.gen::<f64>()) * width + dot_size;
    let h = dot_size * 2.0;
    let mut y = 0.0;
    let mut at = i;
    loop {
        dots[at].pos.x = x + rng.gen::<f64>() * dot_size * 0.125;
        dots[at].pos.y = y + rng.gen::<f64>() * dot_size * 0.125;
        y += h;
        match dots[at].springs.first_mut() {
            Some(spring) => {
                spring.set_rest_length(h);
                at = spring.to;
            }
            None => break,
        }
    }
}


#[cfg(test)]
use rand::SeedableRng;

#[test]
fn test_vary_stays_in_band() {
    let mut rng = Pcg64Mcg::seed_from_u64(7);
    for _ in 0..1000 {
        let v = vary(&mut rng);
        assert!(v >= 0.8 && v < 1.2);
    }
}

#[test]
fn test_dot_radius_scales_with_root_mass() {
    assert_eq!(dot_radius(27.0, DEFAULT_MASS), 27.0);
    assert_eq!(dot_radius(27.0, DEFAULT_MASS * 4.0), 54.0);
}

#[test]
fn test_car_shape() {
    let mut rng = Pcg64Mcg::seed_from_u64(1);
    let mut dots = Vec::new();
    build_car(&mut dots, &mut rng, 27.0, 540.0);

    assert_eq!(dots.len(), 3);
    let floor_y = 540.0 - 2.0 * 27.0;
    assert_eq!(dots[0].pos.y, floor_y);
    assert_eq!(dots[1].pos.y, floor_y);
    assert!(dots[2].pos.y < floor_y);
    for wheel in &dots[0..2] {
        assert!(wheel.mass >= DEFAULT_MASS * 0.8 && wheel.mass < DEFAULT_MASS * 1.2);
    }
    assert!(dots[2].mass >= MIN_MASS * 0.8 && dots[2].mass < MIN_MASS * 1.2);

    // axle at default stiffness, body slung on weak springs
    assert_eq!(dots[1].springs.len(), 1);
    assert_eq!(dots[1].springs[0].to, 0);
    assert!(dots[1].springs[0].k >= DEFAULT_K * 0.8 && dots[1].springs[0].k < DEFAULT_K * 1.2);
    assert_eq!(dots[2].springs.len(), 2);
    assert_eq!(dots[2].springs[0].to, 1);
    assert_eq!(dots[2].springs[1].to, 0);
    for spring in &dots[2].springs {
        assert!(spring.k >= MIN_K * 0.8 && spring.k < MIN_K * 1.2);
        assert_eq!(spring.from_arm.torque_k, ARM_K_FACTOR * spring.k);
    }
}

#[test]
fn test_backward_link_is_dropped() {
    let mut rng = Pcg64Mcg::seed_from_u64(2);
    let mut dots = Vec::new();
    new_dot(&mut dots, &mut rng, 27.0, Vec2::new(0.0, 0.0), DEFAULT_MASS);
    new_dot(&mut dots, &mut rng, 27.0, Vec2::new(50.0, 0.0), DEFAULT_MASS);

    link(&mut dots, &mut rng, 0, 1);
    assert!(dots[0].springs.is_empty());
    assert!(dots[1].springs.is_empty());
    link(&mut dots, &mut rng, 1, 0);
    assert_eq!(dots[1].springs.len(), 1);
}

#[test]
fn test_append_aliens_layout() {
    let mut rng = Pcg64Mcg::seed_from_u64(3);
    let mut dots = Vec::new();
    build_car(&mut dots, &mut rng, 27.0, 540.0);

    let aliens = append_aliens(&mut dots, &mut rng, 960.0, 27.0).unwrap();
    assert_eq!(dots.len(), 18);
    assert_eq!(aliens.i_letter_dots, 13);
    assert_eq!(aliens.letters.len(), 5);
    assert!(aliens.letters.iter().all(|&u| u < ALPHABET));

    // each letter dot hangs a two-dot chain: 13 -> 4 -> 3 up through 17 -> 12 -> 11
    for &(letter_dot, top) in &[(13usize, 4usize), (14, 6), (15, 8), (16, 10), (17, 12)] {
        assert_eq!(dots[letter_dot].springs.len(), 1);
        assert_eq!(dots[letter_dot].springs[0].to, top);
        assert_eq!(dots[top].springs.len(), 1);
        assert_eq!(dots[top].springs[0].to, top - 1);
        assert!(dots[top - 1].springs.is_empty());

        // cycled into place ahead of the view with the chain re-spaced
        assert!(dots[letter_dot].pos.x > 960.0);
        assert!(dots[letter_dot].pos.y < dots[top].pos.y);
        assert_eq!(dots[letter_dot].springs[0].rest_length(), 54.0);
        assert_eq!(dots[top].springs[0].rest_length(), 54.0);
    }
}

#[test]
fn test_append_aliens_skipped_when_arena_full() {
    let mut rng = Pcg64Mcg::seed_from_u64(4);
    let mut dots = Vec::new();
    for _ in 0..10 {
        new_dot(&mut dots, &mut rng, 27.0, Vec2::zero(), DEFAULT_MASS);
    }

    assert!(append_aliens(&mut dots, &mut rng, 960.0, 27.0).is_none());
    assert_eq!(dots.len(), 10);
}
