//! Coordinate and size types shared by the view, renderers and picking.
//!
//! Two pixel spaces exist:
//! - logical pixels (DPI-independent), used for pointer input and sizing
//! - device pixels (`logical × scale_factor`), used for surfaces, the picking
//!   target and `gl_FragCoord`-style reads
//!
//! World space is right-handed, +Y up; the camera maps it to clip space.

mod bounds;
mod size;
mod viewport;

pub use bounds::Bounds3;
pub use size::ViewSize;
pub use viewport::Viewport;
