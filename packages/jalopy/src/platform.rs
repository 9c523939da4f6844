//! Floating platform slabs the wheels ride over.
//!
//! A platform is a thick line segment with a precomputed unit surface normal. Contact
//! is judged against a dot's bottom edge: [`Platform::on_height`] measures how far that
//! edge has climbed from the slab's underside, so a value between zero and the slab
//! thickness means the edge is inside the slab, and pushing along the normal walks it
//! out through the top face. Values grow near the ends to ramp dots off the edges.

use dotweb::Node;
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use vek::*;


pub const PLATFORM_BOUNCE: f64 = 0.5;
/// Escape speed scale for the contact push, per unit of penetration.
pub const PLATFORM_SPEED: f64 = 9.0;
/// How far above a surface a wheel may float before it stops counting as supported,
/// in dot sizes.
pub const PLATFORM_STICK: f64 = 0.3;
/// `on_height` result meaning no contact at all.
pub const MISS: f64 = 1e9;


#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Platform {
    pub left: Vec2<f64>,
    pub right: Vec2<f64>,
    /// Slab thickness.
    pub height: f64,
    surface: Vec2<f64>,
    surface_p: f64,
}

impl Platform {
    pub fn new(left: Vec2<f64>, right: Vec2<f64>, height: f64) -> Self {
        let along = right - left;
        let surface = Vec2::new(along.y, -along.x) / along.magnitude();
        Platform {
            left,
            right,
            height,
            surface,
            surface_p: left.dot(surface),
        }
    }

    /// Unit normal of the riding surface. Zero for a default, inert platform.
    pub fn surface(&self) -> Vec2<f64> {
        self.surface
    }

    /// A fresh platform past the right edge of the view: one to two view widths ahead,
    /// a fifth to two fifths of a view wide, in the lower band of the world, gently
    /// sloped.
    pub fn spawn_ahead(
        rng: &mut Pcg64Mcg,
        view_x: f64,
        width: f64,
        height: f64,
        dot_size: f64,
    ) -> Self {
        let left_x = view_x + (1.0 + rng.gen::<f64>()) * width;
        let right_x = left_x + (1.0 + rng.gen::<f64>()) * 0.2 * width;
        let left_y = (0.65 + rng.gen::<f64>()) * 0.75 * height;
        let right_y = left_y + (rng.gen::<f64>() - 0.5) * 0.4 * height;
        let thickness = (1.0 + rng.gen::<f64>()) * 0.4 * dot_size;
        Platform::new(
            Vec2::new(left_x, left_y),
            Vec2::new(right_x, right_y),
            thickness,
        )
    }

    /// Climb of the dot's bottom edge from the slab's underside, or [`MISS`] when the
    /// dot is outside the x-span or its bottom edge is below the underside (fallen
    /// through). Results at or beyond the thickness mean the edge is clear of the
    /// slab. The x-span test treats the slab as horizontal.
    pub fn on_height(&self, dot: &Node) -> f64 {
        if dot.pos.x <= self.left.x || dot.pos.x >= self.right.x {
            return MISS;
        }
        let mut h = dot.pos.dot(self.surface) - self.surface_p - dot.radius;
        if h < 0.0 {
            return MISS;
        }
        let left_slope = dot.pos.x - self.left.x;
        if left_slope < self.height {
            h += self.height - left_slope;
        } else {
            let right_slope = self.right.x - dot.pos.x;
            if right_slope < self.height {
                h += self.height - right_slope;
            }
        }
        h
    }

    /// Contact response: reflect and damp the normal velocity component when the dot is
    /// moving into the surface, then push the dot `depth` along the surface normal.
    pub fn bounce(&self, dot: &mut Node, depth: f64) {
        let v_norm = dot.vel.dot(self.surface);
        if v_norm < 0.0 {
            dot.vel = (dot.vel - self.surface * (2.0 * v_norm)) * PLATFORM_BOUNCE;
        }
        dot.pos += self.surface * depth;
    }
}


#[cfg(test)]
use rand::SeedableRng;

#[cfg(test)]
fn flat_platform() -> Platform {
    Platform::new(Vec2::new(0.0, 100.0), Vec2::new(100.0, 100.0), 5.0)
}

#[cfg(test)]
fn dot_at(x: f64, y: f64) -> Node {
    Node::new([x, y], 10.0, 1.0)
}

#[test]
fn test_flat_platform_surface() {
    let p = flat_platform();
    assert_eq!(p.surface, Vec2::new(0.0, -1.0));
    assert_eq!(p.surface_p, -100.0);
}

#[test]
fn test_on_height_contact_band() {
    let p = flat_platform();
    // bottom edge of the dot sits at y + 10; the slab's underside line is y = 100
    assert_eq!(p.on_height(&dot_at(50.0, 80.0)), 10.0);
    assert_eq!(p.on_height(&dot_at(50.0, 86.0)), 4.0);
    assert_eq!(p.on_height(&dot_at(50.0, 91.0)), MISS);
    assert_eq!(p.on_height(&dot_at(150.0, 86.0)), MISS);
    assert_eq!(p.on_height(&dot_at(0.0, 86.0)), MISS);
}

#[test]
fn test_on_height_ramps_near_ends() {
    let p = flat_platform();
    // 2 in from the left end adds 5 - 2 to the plain climb of 4
    assert_eq!(p.on_height(&dot_at(2.0, 86.0)), 7.0);
    assert_eq!(p.on_height(&dot_at(98.0, 86.0)), 7.0);
    assert_eq!(p.on_height(&dot_at(50.0, 86.0)), 4.0);
}

#[test]
fn test_sloped_platform_normal_is_unit() {
    let p = Platform::new(Vec2::new(0.0, 100.0), Vec2::new(40.0, 130.0), 5.0);
    assert!((p.surface.magnitude() - 1.0).abs() < 1e-12);
    assert_eq!(p.surface, Vec2::new(0.6, -0.8));
}

#[test]
fn test_bounce_reflects_incoming_velocity_only() {
    let p = flat_platform();

    let mut incoming = dot_at(50.0, 95.0);
    incoming.vel = Vec2::new(3.0, 4.0);
    p.bounce(&mut incoming, 2.0);
    assert_eq!(incoming.vel, Vec2::new(1.5, -2.0));
    assert_eq!(incoming.pos, Vec2::new(50.0, 93.0));

    let mut departing = dot_at(50.0, 95.0);
    departing.vel = Vec2::new(3.0, -4.0);
    p.bounce(&mut departing, 2.0);
    assert_eq!(departing.vel, Vec2::new(3.0, -4.0));
    assert_eq!(departing.pos, Vec2::new(50.0, 93.0));
}

#[test]
fn test_spawn_ahead_lands_past_the_view() {
    let mut rng = Pcg64Mcg::seed_from_u64(11);
    for _ in 0..50 {
        let p = Platform::spawn_ahead(&mut rng, 5000.0, 960.0, 540.0, 27.0);
        assert!(p.left.x >= 5000.0 + 960.0);
        assert!(p.right.x > p.left.x);
        assert!(p.height >= 0.4 * 27.0 && p.height < 0.8 * 27.0);
        assert!(p.left.y > 0.4 * 540.0 && p.left.y < 540.0 * 1.24);
        assert!((p.surface.magnitude() - 1.0).abs() < 1e-12);
    }
}
