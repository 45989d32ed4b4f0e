use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::coords::Viewport;
use crate::paint::{Color, Palette};
use crate::schedule::RenderMode;

/// Per-frame blending parameters, set by the caller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    /// Global opacity, `0..=1`.
    pub alpha: f32,
    /// Blend towards the clear color, `0..=1`.
    pub fade: f32,
    /// Blend towards grayscale, `0..=1`.
    pub desaturate: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fade: 0.0,
            desaturate: 0.0,
        }
    }
}

impl FrameParams {
    /// Clamps every field into `0..=1`; non-finite values fall back to the default.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let clamp = |v: f32, fallback: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback };
        Self {
            alpha: clamp(self.alpha, d.alpha),
            fade: clamp(self.fade, d.fade),
            desaturate: clamp(self.desaturate, d.desaturate),
        }
    }
}

/// Uniform block shared by every layer shader (`Frame` in WGSL).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Linear, premultiplied.
    pub clear_color: [f32; 4],
    /// Device pixels.
    pub viewport: [f32; 2],
    pub pixel_ratio: f32,
    pub render_mode: u32,
    pub alpha: f32,
    pub fade: f32,
    pub desaturate: f32,
    pub _pad: f32,
}

impl FrameUniforms {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        view: Mat4,
        projection: Mat4,
        model: Mat4,
        clear: Color,
        viewport: Viewport,
        pixel_ratio: f32,
        mode: RenderMode,
        params: FrameParams,
    ) -> Self {
        let c = clear.to_wgpu_linear();
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            clear_color: [c.r as f32, c.g as f32, c.b as f32, c.a as f32],
            viewport: [viewport.width, viewport.height],
            pixel_ratio,
            render_mode: mode as u32,
            alpha: params.alpha,
            fade: params.fade,
            desaturate: params.desaturate,
            _pad: 0.0,
        }
    }

    /// Same frame, other mode.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode as u32;
        self
    }
}

const FRAME_UNIFORMS_SIZE: u64 = std::mem::size_of::<FrameUniforms>() as u64;

/// Group 0 of every layer pipeline: the frame uniforms (one dynamic-offset
/// slot per [`RenderMode`]) and the palette texture.
pub struct FrameBindings {
    layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,
    slot_stride: u64,
    bind_group: Option<wgpu::BindGroup>,
    palette_generation: u64,
}

impl FrameBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("loom frame bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(FRAME_UNIFORMS_SIZE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let slot_stride = slot_stride(FRAME_UNIFORMS_SIZE, align);
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("loom frame ubo"),
            size: slot_stride * RenderMode::ALL.len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            layout,
            ubo,
            slot_stride,
            bind_group: None,
            palette_generation: 0,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Dynamic offset of `mode`'s uniform slot.
    #[inline]
    pub fn offset(&self, mode: RenderMode) -> u32 {
        (self.slot_stride * mode.index() as u64) as u32
    }

    /// Writes `uniforms` into `mode`'s slot.
    pub fn write(&self, queue: &wgpu::Queue, mode: RenderMode, uniforms: &FrameUniforms) {
        let u = uniforms.with_mode(mode);
        queue.write_buffer(&self.ubo, self.offset(mode) as u64, bytemuck::bytes_of(&u));
    }

    /// Rebuilds the bind group when the palette texture was recreated.
    ///
    /// The palette must have been uploaded (`Palette::ensure_gpu`) first.
    pub fn ensure_bind_group(&mut self, device: &wgpu::Device, palette: &Palette) -> bool {
        if self.bind_group.is_some() && self.palette_generation == palette.generation() {
            return true;
        }
        let Some(palette_view) = palette.view() else {
            log::warn!("frame bindings requested before palette upload");
            return false;
        };

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("loom frame bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.ubo,
                        offset: 0,
                        size: NonZeroU64::new(FRAME_UNIFORMS_SIZE),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(palette_view),
                },
            ],
        }));
        self.palette_generation = palette.generation();
        true
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

fn slot_stride(size: u64, align: u64) -> u64 {
    let align = align.max(1);
    size.div_ceil(align) * align
}
