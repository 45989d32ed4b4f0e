/// Borrowed device + queue.
///
/// Everything that creates or fills GPU resources outside of a frame (ingestion,
/// resolve passes, picking reads) takes this instead of a full [`Gpu`](super::Gpu),
/// so the same code runs against a windowed or headless device.
#[derive(Copy, Clone)]
pub struct DeviceCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> DeviceCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}
