//! loom engine crate.
//!
//! GPU graph canvas: the platform + GPU runtime, the dense point store, the
//! resolve pass, color picking, the progressive render scheduler and the
//! graph view tying them together.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod camera;
pub mod points;
pub mod resolve;
pub mod picking;
pub mod schedule;
pub mod render;
pub mod graph;
