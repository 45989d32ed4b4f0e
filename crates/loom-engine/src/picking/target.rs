use anyhow::Result;

use crate::device::{map_read, DeviceCtx};

/// Linear 8-bit RGBA so written ids survive unchanged.
pub const PICKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Off-screen picking texture, sized in device pixels.
///
/// The texture is created lazily and dropped on resize; the one-pixel
/// readback is the only place the view waits on the GPU.
pub struct PickingTarget {
    size: (u32, u32),
    surface: Option<PickingSurface>,
    staging: Option<wgpu::Buffer>,
}

struct PickingSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl PickingTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width.max(1), height.max(1)),
            surface: None,
            staging: None,
        }
    }

    /// Size in device pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        log::debug!("picking target {}x{} -> {}x{}", self.size.0, self.size.1, size.0, size.1);
        self.size = size;
        self.surface = None;
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.surface.as_ref().map(|s| &s.view)
    }

    /// Creates the texture for the current size if needed.
    pub fn ensure(&mut self, device: &wgpu::Device) -> &wgpu::TextureView {
        let (width, height) = self.size;
        let surface = self.surface.get_or_insert_with(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("loom picking target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: PICKING_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            PickingSurface { texture, view }
        });
        &surface.view
    }

    /// Reads the pixel at device coordinates `(x, y)`.
    ///
    /// `Ok(None)` when the coordinates are outside the target or nothing was
    /// rendered into it yet.
    pub fn read_pixel(&mut self, ctx: DeviceCtx<'_>, x: u32, y: u32) -> Result<Option<[u8; 4]>> {
        let (w, h) = self.size;
        if x >= w || y >= h {
            return Ok(None);
        }
        let Some(surface) = self.surface.as_ref() else {
            return Ok(None);
        };

        let staging = self.staging.get_or_insert_with(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("loom picking readback"),
                size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("loom picking readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let bytes = map_read(ctx.device, staging)?;
        Ok(Some([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_gpu;
    use crate::picking::{decode, encode};

    #[test]
    fn resize_drops_texture() {
        let mut t = PickingTarget::new(0, 10);
        assert_eq!(t.size(), (1, 10));
        t.resize(20, 10);
        assert_eq!(t.size(), (20, 10));
        assert!(t.view().is_none());
    }

    #[test]
    fn reads_back_cleared_id() {
        let Some(gpu) = test_gpu() else { return };
        let mut target = PickingTarget::new(4, 3);
        let [r, g, b, a] = encode(300);
        let view = target.ensure(gpu.device());

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("test picking clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64 / 255.0,
                            g: g as f64 / 255.0,
                            b: b as f64 / 255.0,
                            a: a as f64 / 255.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        gpu.queue().submit(std::iter::once(encoder.finish()));

        let px = target.read_pixel(gpu.ctx(), 3, 2).unwrap().unwrap();
        assert_eq!(decode(px), Some(300));
        assert_eq!(target.read_pixel(gpu.ctx(), 4, 0).unwrap(), None);
    }
}
