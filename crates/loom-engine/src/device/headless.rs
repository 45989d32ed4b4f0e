use anyhow::{Context, Result};

use super::{DeviceCtx, GpuInit};

/// Device and queue without a surface.
///
/// Used for offscreen resolve passes, picking readback and GPU tests.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub async fn new(init: &GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("loom headless device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::debug!("headless adapter `{}` ({:?})", info.name, info.backend);

        Ok(Self { adapter, device, queue })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn ctx(&self) -> DeviceCtx<'_> {
        DeviceCtx::new(&self.device, &self.queue)
    }
}

/// Headless device for tests; `None` on machines without any adapter, in
/// which case GPU tests return early.
#[cfg(test)]
pub(crate) fn test_gpu() -> Option<HeadlessGpu> {
    match pollster::block_on(HeadlessGpu::new(&GpuInit::headless())) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}
