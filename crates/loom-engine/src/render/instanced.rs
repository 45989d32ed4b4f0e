use wgpu::util::DeviceExt;

use crate::picking::PICKING_FORMAT;
use crate::resolve::ResolvedBuffer;
use crate::schedule::RenderMode;

use super::attributes::InstanceLayout;
use super::common::{premul_alpha_blend, QuadVertex, QUAD_INDICES, QUAD_VERTICES};
use super::uniforms::FrameBindings;
use super::RenderCtx;

/// Draws one resolved buffer as instanced quads.
///
/// Each shader provides `vs_main`, `fs_main` (surface) and `fs_picking`
/// (writes the instance's picking color, no blending). Both pipelines are
/// created lazily; the surface one is rebuilt when the surface format changes.
pub struct InstancedRenderer {
    label: &'static str,
    source: &'static str,
    instance_layout: InstanceLayout,

    shader: Option<wgpu::ShaderModule>,
    pipeline_layout: Option<wgpu::PipelineLayout>,

    surface_format: Option<wgpu::TextureFormat>,
    surface_pipeline: Option<wgpu::RenderPipeline>,
    picking_pipeline: Option<wgpu::RenderPipeline>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl InstancedRenderer {
    pub fn new(label: &'static str, source: &'static str, instance_layout: InstanceLayout) -> Self {
        Self {
            label,
            source,
            instance_layout,
            shader: None,
            pipeline_layout: None,
            surface_format: None,
            surface_pipeline: None,
            picking_pipeline: None,
            quad_vbo: None,
            quad_ibo: None,
        }
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Creates pipelines and static buffers. Call before opening the pass.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, frame: &FrameBindings) {
        self.ensure_shader(ctx, frame);
        self.ensure_static_buffers(ctx);
        self.ensure_surface_pipeline(ctx);
        self.ensure_picking_pipeline(ctx);
    }

    /// Records the draw of `instances` into an open pass targeting
    /// `mode`'s attachment.
    pub fn draw(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        frame: &FrameBindings,
        mode: RenderMode,
        instances: &ResolvedBuffer,
    ) {
        if instances.data_rows == 0 {
            return;
        }
        let pipeline = if mode.is_picking() {
            self.picking_pipeline.as_ref()
        } else {
            self.surface_pipeline.as_ref()
        };
        let Some(pipeline) = pipeline else {
            log::debug!("{} draw skipped, pipeline not prepared", self.label);
            return;
        };
        let Some(bind_group) = frame.bind_group() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[frame.offset(mode)]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instances.buffer.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..instances.data_rows as u32);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_shader(&mut self, ctx: &RenderCtx<'_>, frame: &FrameBindings) {
        if self.shader.is_some() && self.pipeline_layout.is_some() {
            return;
        }
        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.into()),
        });
        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: &[frame.layout()],
            immediate_size: 0,
        });
        self.shader = Some(shader);
        self.pipeline_layout = Some(pipeline_layout);
        self.surface_pipeline = None;
        self.picking_pipeline = None;
    }

    fn ensure_surface_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.surface_format == Some(ctx.surface_format) && self.surface_pipeline.is_some() {
            return;
        }
        let pipeline = self.create_pipeline(ctx, "fs_main", ctx.surface_format, Some(premul_alpha_blend()));
        self.surface_format = Some(ctx.surface_format);
        self.surface_pipeline = pipeline;
    }

    fn ensure_picking_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.picking_pipeline.is_some() {
            return;
        }
        self.picking_pipeline = self.create_pipeline(ctx, "fs_picking", PICKING_FORMAT, None);
    }

    fn create_pipeline(
        &self,
        ctx: &RenderCtx<'_>,
        fragment_entry: &str,
        format: wgpu::TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> Option<wgpu::RenderPipeline> {
        let shader = self.shader.as_ref()?;
        let layout = self.pipeline_layout.as_ref()?;

        Some(ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), self.instance_layout.buffer_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }
        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("loom quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("loom quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }
}
