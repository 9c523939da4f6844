//! A springy two-wheeled jalopy bouncing along an endless platform course, with
//! letter-carrying alien chains to chase down. The vehicle and the aliens are `dotweb`
//! spring webs; everything else here is the world around them: gravity, platforms,
//! wheel drive, view scrolling, scene recycling, and a headless PNG frame recorder.

#[macro_use]
extern crate tracing;

pub mod frame_clock;
pub mod logging;
pub mod settings;
pub mod scene;
pub mod platform;
pub mod wheel;
pub mod world;
pub mod render;
pub mod util_hex_color;
