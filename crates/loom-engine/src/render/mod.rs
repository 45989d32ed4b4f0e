//! GPU rendering subsystem.
//!
//! Layers draw resolved instance buffers as instanced quads. Every pipeline
//! shares group 0 ([`FrameBindings`]): the frame uniforms, selected per
//! [`RenderMode`](crate::schedule::RenderMode) by dynamic offset, and the
//! palette texture.
//!
//! Convention:
//! - World geometry goes through `projection * view * model`.
//! - Screen-space extents (edge widths) are logical pixels, scaled by the
//!   pixel ratio in the shader.

mod attributes;
mod common;
mod ctx;
mod instanced;
mod uniforms;

pub use attributes::{vertex_format, InstanceLayout};
pub use ctx::{RenderCtx, RenderTarget};
pub use instanced::InstancedRenderer;
pub use uniforms::{FrameBindings, FrameParams, FrameUniforms};

/// Node disc shader.
pub const NODE_SHADER: &str = concat!(
    include_str!("shaders/frame.wgsl"),
    "\n",
    include_str!("shaders/nodes.wgsl")
);

/// Edge segment shader.
pub const EDGE_SHADER: &str = concat!(
    include_str!("shaders/frame.wgsl"),
    "\n",
    include_str!("shaders/edges.wgsl")
);
