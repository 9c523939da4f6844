//! Mass-and-spring web integrator for springy 2D game bodies.
//!
//! A web is a plain `Vec<Node>`; springs live on their owning node and point at lower
//! node indices. Call [`prepare`] once the topology is built, then [`step`] every frame:
//!
//! ```
//! use dotweb::{Node, add_spring, prepare, step};
//!
//! let mut nodes = vec![
//!     Node::new([0.0, 0.0], 1.0, 1.0),
//!     Node::new([4.0, 0.0], 1.0, 1.0),
//! ];
//! add_spring(&mut nodes, 1, 0, 0.5, 100.0);
//! prepare(&mut nodes);
//!
//! // stretch the link, then let it pull back in
//! nodes[1].pos.x = 6.0;
//! for _ in 0..100 {
//!     step(&mut nodes, 1.0 / 60.0);
//! }
//! assert!(nodes[1].pos.x < 6.0);
//! ```
//!
//! The integrator is built to be driven: callers are expected to overwrite positions,
//! velocities, rest lengths, and rendering angles between steps, and the web treats
//! whatever it finds as current truth. Stepping is deterministic, so identical state
//! and time steps replay identical trajectories.
//!
//! One precondition is load-bearing: `dt` must be small enough that no spring's bearing
//! sweeps half a turn or more in a single step, or the arms' turn counters miscount and
//! rotational rest angles silently shift.

#[macro_use]
extern crate tracing;


mod step;
mod web;


pub use crate::{
    step::{
        prepare,
        step,
        step_with,
    },
    web::{
        add_spring,
        Arm,
        Node,
        Resistance,
        Spring,
    },
};
