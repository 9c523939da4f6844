//! Frame timing: measured time steps with a freeze guard, plus real-time pacing.

use std::time::{
    Duration,
    Instant,
};


/// Measured gaps at least this long count as a freeze (a stall, a suspended process)
/// rather than honest frame time, and the physics reuses the previous step instead.
pub const FREEZE_OVER: f64 = 0.3;


/// One frame's worth of time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tick {
    /// Admitted step, for the physics.
    pub dt: f64,
    /// Raw measured step, for systems that want wall time even through a freeze.
    pub raw_dt: f64,
}

impl Tick {
    /// Fixed step at the given frame rate, for offline rendering.
    pub fn fixed(fps: u32) -> Self {
        let dt = 1.0 / fps as f64;
        Tick { dt, raw_dt: dt }
    }
}

/// Measures the time between frames and paces a real-time loop.
pub struct FrameClock {
    last_call: Instant,
    next_frame: Instant,
    held_dt: f64,
}

impl FrameClock {
    /// Construct starting now.
    pub fn start() -> Self {
        let now = Instant::now();
        FrameClock {
            last_call: now,
            next_frame: now,
            held_dt: 0.0,
        }
    }

    /// Measure the time since the previous call and fold it into the admitted step. A
    /// gap of [`FREEZE_OVER`] or longer keeps the previous admitted step, except on the
    /// first call, which has nothing to fall back on.
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let raw_dt = (now - self.last_call).as_secs_f64();
        self.last_call = now;
        self.admit(raw_dt)
    }

    fn admit(&mut self, raw_dt: f64) -> Tick {
        if raw_dt < FREEZE_OVER || self.held_dt == 0.0 {
            self.held_dt = raw_dt;
        }
        Tick {
            dt: self.held_dt,
            raw_dt,
        }
    }

    /// Call after presenting a frame: sleep out the rest of the frame interval, or skip
    /// ahead when the loop has fallen behind schedule.
    pub fn pace(&mut self, frame: Duration) {
        self.next_frame += frame;
        let now = Instant::now();
        if self.next_frame < now {
            let behind_nanos = (now - self.next_frame).as_nanos();
            // poor man's div_ceil
            let behind_frames = match behind_nanos % frame.as_nanos() {
                0 => behind_nanos / frame.as_nanos(),
                _ => behind_nanos / frame.as_nanos() + 1,
            };
            let behind_frames = u32::try_from(behind_frames).expect("time broke");
            warn!("running too slow, skipping {behind_frames} frames");
            self.next_frame += frame * behind_frames;
        } else {
            std::thread::sleep(self.next_frame - now);
        }
    }
}


#[test]
fn test_freeze_keeps_previous_step() {
    let mut clock = FrameClock::start();
    assert_eq!(
        clock.admit(0.016),
        Tick {
            dt: 0.016,
            raw_dt: 0.016,
        },
    );
    // a two second stall is not honest frame time
    assert_eq!(
        clock.admit(2.0),
        Tick {
            dt: 0.016,
            raw_dt: 2.0,
        },
    );
    assert_eq!(
        clock.admit(0.02),
        Tick {
            dt: 0.02,
            raw_dt: 0.02,
        },
    );
}

#[test]
fn test_first_step_is_admitted_even_when_long() {
    let mut clock = FrameClock::start();
    assert_eq!(clock.admit(5.0), Tick { dt: 5.0, raw_dt: 5.0 });
}

#[test]
fn test_fixed_tick_has_equal_steps() {
    let tick = Tick::fixed(60);
    assert_eq!(tick.dt, 1.0 / 60.0);
    assert_eq!(tick.raw_dt, tick.dt);
}

#[test]
fn test_measured_steps_are_never_negative() {
    let mut clock = FrameClock::start();
    let tick = clock.tick();
    assert!(tick.raw_dt >= 0.0);
    assert_eq!(tick.dt, tick.raw_dt);
}
