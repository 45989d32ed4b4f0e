//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (windowed or headless)
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - blocking buffer readback for the few places that need GPU results on the CPU

mod context;
mod handles;
mod headless;
mod init;
mod readback;
mod surface;

pub use context::{Gpu, GpuFrame};
pub use handles::DeviceCtx;
pub use headless::HeadlessGpu;
pub use init::GpuInit;
pub use readback::read_buffer;
pub use surface::SurfaceErrorAction;

pub(crate) use readback::map_read;

#[cfg(test)]
pub(crate) use headless::test_gpu;
