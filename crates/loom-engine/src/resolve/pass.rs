use std::collections::HashMap;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use loom_layout::{Layout, PackedBuffer};
use wgpu::util::DeviceExt;

use crate::device::{read_buffer, DeviceCtx};

use super::ResolveProgram;

pub const RESOLVE_WORKGROUP_SIZE: u32 = 64;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ResolveParams {
    rows: u32,
    source_stride: u32,
    target_stride: u32,
    _pad: u32,
    user: [f32; 4],
}

/// Target rows produced by a resolve dispatch.
///
/// The buffer carries `STORAGE | VERTEX | COPY_SRC` so renderers bind it
/// directly as an instance buffer.
pub struct ResolvedBuffer {
    pub buffer: wgpu::Buffer,
    pub layout: Layout,
    /// Rows written, including any padding rows of the source.
    pub rows: usize,
    /// Rows that came from records; renderers draw only these.
    pub data_rows: usize,
}

impl ResolvedBuffer {
    #[inline]
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Maps the target rows back to the CPU.
    pub fn read_back(&self, ctx: DeviceCtx<'_>) -> Result<PackedBuffer> {
        let size = (self.rows * self.stride()) as u64;
        let bytes = read_buffer(ctx.device, ctx.queue, &self.buffer, size)?;
        PackedBuffer::from_parts(bytes, self.layout.clone())
            .context("resolved buffer size is not a whole number of rows")
    }
}

struct ResolvePipeline {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// Compiled pipelines are keyed by label and body; the body fixes the words
/// a program reads and writes.
type PipelineKey = (&'static str, &'static str);

/// Runs [`ResolveProgram`]s; compiled pipelines are cached per program.
#[derive(Default)]
pub struct ResolvePass {
    pipelines: HashMap<PipelineKey, ResolvePipeline>,
}

impl ResolvePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every row of `source` against `points`.
    ///
    /// `source` must have been packed with the program's full source schema,
    /// and both strides must be word multiples. `user` is passed through as
    /// `params.user`.
    pub fn compute(
        &mut self,
        ctx: DeviceCtx<'_>,
        points: &wgpu::Buffer,
        source: &PackedBuffer,
        program: &dyn ResolveProgram,
        user: [f32; 4],
    ) -> Result<ResolvedBuffer> {
        let label = program.label();
        let expected = program.source_layout();
        anyhow::ensure!(
            source.layout() == &expected,
            "`{label}`: source layout {:?} does not match program source layout {:?}",
            source.layout().field_names().collect::<Vec<_>>(),
            expected.field_names().collect::<Vec<_>>()
        );
        let target_layout = program.target_layout();
        let (source_stride, target_stride) = (expected.stride(), target_layout.stride());
        anyhow::ensure!(
            source_stride > 0 && source_stride % 4 == 0,
            "`{label}`: source stride {source_stride} is not a positive multiple of 4"
        );
        anyhow::ensure!(
            target_stride > 0 && target_stride % 4 == 0,
            "`{label}`: target stride {target_stride} is not a positive multiple of 4"
        );

        let (rows, data_rows) = (source.rows(), source.data_rows());
        let target = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (rows.max(1) * target_stride) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        if rows == 0 {
            return Ok(ResolvedBuffer { buffer: target, layout: target_layout, rows, data_rows });
        }

        let groups = (rows as u32).div_ceil(RESOLVE_WORKGROUP_SIZE);
        let max_x = ctx.device.limits().max_compute_workgroups_per_dimension.max(1);
        let (groups_x, groups_y) = if groups <= max_x {
            (groups, 1)
        } else {
            (max_x, groups.div_ceil(max_x))
        };
        anyhow::ensure!(
            groups_y <= max_x,
            "`{label}`: {rows} rows exceed the dispatch limit"
        );

        let params = ResolveParams {
            rows: rows as u32,
            source_stride: (source_stride / 4) as u32,
            target_stride: (target_stride / 4) as u32,
            _pad: 0,
            user,
        };

        let pipeline = self.ensure_pipeline(ctx.device, program);

        let params_ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("loom resolve params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let source_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("loom resolve source"),
            contents: source.bytes(),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("loom resolve bind group"),
            layout: &pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: params_ubo.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: points.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: source_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: target.as_entire_binding() },
            ],
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("loom resolve encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&pipeline.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        log::debug!("`{label}` resolved {rows} rows ({groups_x}x{groups_y} workgroups)");

        Ok(ResolvedBuffer { buffer: target, layout: target_layout, rows, data_rows })
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        program: &dyn ResolveProgram,
    ) -> &ResolvePipeline {
        let key = (program.label(), program.wgsl());
        self.pipelines.entry(key).or_insert_with(|| {
            log::debug!("compiling resolve program `{}`", program.label());

            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.label()),
                source: wgpu::ShaderSource::Wgsl(program.shader_source().into()),
            });

            let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            };

            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("loom resolve bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: wgpu::BufferSize::new(
                                    std::mem::size_of::<ResolveParams>() as u64,
                                ),
                            },
                            count: None,
                        },
                        storage(1, true),
                        storage(2, true),
                        storage(3, false),
                    ],
                });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("loom resolve pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(program.label()),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("resolve_main"),
                compilation_options: Default::default(),
                cache: None,
            });

            ResolvePipeline { bind_group_layout, pipeline }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_gpu;
    use crate::points::{DensePointStore, Point};
    use loom_layout::{pack, FieldDescriptor, GlType, MappingTable, PackOptions, Schema, Value};

    /// Copies the referenced point's position and doubles its radius.
    struct LiftPoint;

    impl ResolveProgram for LiftPoint {
        fn label(&self) -> &'static str {
            "test lift point"
        }

        fn wgsl(&self) -> &'static str {
            r#"
fn resolve_row(row: u32) {
    let p = point(src_u32(row, 0u));
    dst_vec3(row, 0u, p.xyz);
    dst_f32(row, 3u, p.w * 2.0 + params.user.x);
}
"#
        }

        fn source_schema(&self) -> Schema {
            Schema::new(vec![FieldDescriptor::new("point", GlType::U32)]).unwrap()
        }

        fn target_schema(&self) -> Schema {
            Schema::new(vec![
                FieldDescriptor::new("position", GlType::VEC3),
                FieldDescriptor::new("radius", GlType::F32),
            ])
            .unwrap()
        }
    }

    /// Same label as [`LiftPoint`], different body.
    struct ShrinkPoint;

    impl ResolveProgram for ShrinkPoint {
        fn label(&self) -> &'static str {
            LiftPoint.label()
        }

        fn wgsl(&self) -> &'static str {
            r#"
fn resolve_row(row: u32) {
    let p = point(src_u32(row, 0u));
    dst_vec3(row, 0u, p.xyz);
    dst_f32(row, 3u, p.w * 0.5);
}
"#
        }

        fn source_schema(&self) -> Schema {
            LiftPoint.source_schema()
        }

        fn target_schema(&self) -> Schema {
            LiftPoint.target_schema()
        }
    }

    fn source(refs: &[u32]) -> PackedBuffer {
        let mut m = MappingTable::<u32>::new();
        m.set_fn("point", |r: &u32, _| Ok(Some(Value::from(*r))));
        pack(refs, &LiftPoint.source_schema(), &m, PackOptions::default()).unwrap()
    }

    #[test]
    fn mismatched_source_layout_fails_fast() {
        let Some(gpu) = test_gpu() else { return };
        let mut store = DensePointStore::from_points(&[Point::new(0u32, 1.0, 2.0, 3.0)]).unwrap();
        let points = store.upload(gpu.device());

        let schema = Schema::new(vec![FieldDescriptor::new("other", GlType::U32)]).unwrap();
        let bogus = pack(&[0u32], &schema, &MappingTable::new(), PackOptions::default()).unwrap();
        let err = ResolvePass::new()
            .compute(gpu.ctx(), points, &bogus, &LiftPoint, [0.0; 4])
            .err()
            .unwrap();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn output_rows_follow_source_rows() {
        let Some(gpu) = test_gpu() else { return };
        let pts = [
            Point::new("a", 1.0, 2.0, 3.0).with_radius(0.5),
            Point::new("b", -4.0, 5.0, -6.0),
        ];
        let mut store = DensePointStore::from_points(&pts).unwrap();
        let points = store.upload(gpu.device());

        let src = source(&[1, 0, 1]);
        let mut pass = ResolvePass::new();
        let out = pass.compute(gpu.ctx(), points, &src, &LiftPoint, [0.25, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(out.rows, 3);

        let rows = out.read_back(gpu.ctx()).unwrap();
        assert_eq!(rows.read(0, "position", 0), Some(-4.0));
        assert_eq!(rows.read(0, "radius", 0), Some(2.25));
        assert_eq!(rows.read(1, "position", 2), Some(3.0));
        assert_eq!(rows.read(1, "radius", 0), Some(1.25));
        assert_eq!(rows.read(2, "position", 1), Some(5.0));

        // Same inputs, same bits.
        let again = pass.compute(gpu.ctx(), points, &src, &LiftPoint, [0.25, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(again.read_back(gpu.ctx()).unwrap().bytes(), rows.bytes());
    }

    #[test]
    fn shared_label_does_not_share_pipeline() {
        let Some(gpu) = test_gpu() else { return };
        let mut store = DensePointStore::from_points(&[Point::new(0u32, 1.0, 2.0, 3.0).with_radius(4.0)]).unwrap();
        let points = store.upload(gpu.device());
        let src = source(&[0]);

        let mut pass = ResolvePass::new();
        let lifted = pass.compute(gpu.ctx(), points, &src, &LiftPoint, [0.0; 4]).unwrap();
        let shrunk = pass.compute(gpu.ctx(), points, &src, &ShrinkPoint, [0.0; 4]).unwrap();
        assert_eq!(pass.pipelines.len(), 2);
        assert_eq!(lifted.read_back(gpu.ctx()).unwrap().read(0, "radius", 0), Some(8.0));
        assert_eq!(shrunk.read_back(gpu.ctx()).unwrap().read(0, "radius", 0), Some(2.0));
    }

    #[test]
    fn empty_source_produces_no_rows() {
        let Some(gpu) = test_gpu() else { return };
        let mut store = DensePointStore::<u32>::from_points(&[]).unwrap();
        let points = store.upload(gpu.device());
        let out = ResolvePass::new()
            .compute(gpu.ctx(), points, &source(&[]), &LiftPoint, [0.0; 4])
            .unwrap();
        assert_eq!(out.rows, 0);
        assert!(out.read_back(gpu.ctx()).unwrap().bytes().is_empty());
    }
}
