//! Camera and graph transform.
//!
//! The camera supplies view and projection matrices; the graph transform is
//! the single rigid rotation + translation applied to a whole graph.

mod orbit;
mod transform;

pub use orbit::OrbitCamera;
pub use transform::GraphTransform;

use glam::Mat4;

/// Source of view/projection matrices for the frame uniforms.
pub trait Camera {
    fn view(&self) -> Mat4;
    fn projection(&self) -> Mat4;

    /// Width over height of the render target.
    fn aspect(&self) -> f32;
    fn set_aspect(&mut self, aspect: f32);
}
