//! Wheel spin state and the drive force caps.
//!
//! A wheel is one of the first two dots of the arena plus this record. While supported
//! it rolls without slip, so its spin velocity is read straight off the dot; airborne
//! it keeps spinning freely and the throttle spins it up instead of driving the dot.

pub const MAX_WHEEL_FORCE: f64 = 1.1;
/// Drive velocity cap, in dot sizes per second.
pub const MAX_WHEEL_VELOCITY: f64 = 1e1;
pub const WHEEL_GYRATION_FACTOR: f64 = 1.0;
/// Rendering-angle kickback per unit of applied drive force.
pub const WHEEL_DRIVE_ARM_FACTOR: f64 = 1.0;


/// What a wheel is currently resting on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Support {
    #[default]
    None,
    Ground,
    Platform(usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Wheel {
    /// Spin angular velocity, radians per second.
    pub spin_vel: f64,
    /// Accumulated spin, added to the dot's rendering angle when drawn.
    pub spin: f64,
    pub support: Support,
}

/// Whether the throttle may keep pushing at this horizontal velocity. The cap only
/// binds in the direction being driven, so braking against overspeed always works.
pub fn below_drive_cap(force: f64, vel_x: f64, dot_size: f64) -> bool {
    if force > 0.0 && vel_x < MAX_WHEEL_VELOCITY * dot_size {
        return true;
    }
    if force < 0.0 && vel_x > -MAX_WHEEL_VELOCITY * dot_size {
        return true;
    }
    false
}


#[test]
fn test_drive_cap_binds_per_direction() {
    let s = 27.0;
    assert!(below_drive_cap(1.0, 0.0, s));
    assert!(below_drive_cap(1.0, -500.0, s));
    assert!(!below_drive_cap(1.0, 10.0 * s, s));
    assert!(below_drive_cap(-1.0, 10.0 * s, s));
    assert!(!below_drive_cap(-1.0, -10.0 * s, s));
    assert!(!below_drive_cap(0.0, 0.0, s));
}
