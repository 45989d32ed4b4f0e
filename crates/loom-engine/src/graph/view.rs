use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use loom_layout::{pack, MappingTable, PackOptions, Value};

use crate::camera::{Camera, GraphTransform, OrbitCamera};
use crate::coords::ViewSize;
use crate::device::DeviceCtx;
use crate::paint::{Color, Palette};
use crate::picking::{PickEvent, PickingHandle, PickingRouter, PickingTarget};
use crate::points::DensePointStore;
use crate::render::{
    FrameBindings, FrameParams, FrameUniforms, InstanceLayout, InstancedRenderer, RenderCtx,
    RenderTarget,
};
use crate::resolve::{ResolvePass, ResolvedBuffer};
use crate::schedule::{FramePlan, PassTarget, RenderScheduler, SchedulerConfig, TimerToken};

use super::class::{EntityClass, LayerKind};
use super::edges::{Edge, EdgeClass};
use super::nodes::{Node, NodeClass};

/// Construction parameters of a [`GraphView`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewConfig {
    pub scheduler: SchedulerConfig,
    pub background: Color,
    pub params: FrameParams,
    /// Multiplies every node radius at resolve time.
    pub node_scale: f32,
    /// Multiplies every edge width at resolve time.
    pub edge_scale: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            background: Color::rgb(0.07, 0.07, 0.09),
            params: FrameParams::default(),
            node_scale: 1.0,
            edge_scale: 1.0,
        }
    }
}

/// Identifies a layer added to a view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

struct Layer {
    id: LayerId,
    kind: LayerKind,
    picking: PickingHandle,
    resolved: ResolvedBuffer,
}

/// One graph on one canvas.
///
/// Owns the point store, palette, picking state, scheduler, camera and the
/// resolved layers. GPU work takes the device per call; nothing here holds
/// device references between calls.
pub struct GraphView<K> {
    config: ViewConfig,
    size: ViewSize,

    points: Option<DensePointStore<K>>,
    palette: Palette,
    router: PickingRouter<K>,
    picking_target: PickingTarget,
    scheduler: RenderScheduler,
    /// Refinement passes fired by a timer, drawn on the next frame.
    queued: FramePlan,

    camera: OrbitCamera,
    transform: GraphTransform,
    params: FrameParams,

    resolve: ResolvePass,
    layers: Vec<Layer>,
    next_layer: u64,

    frame: Option<FrameBindings>,
    renderers: [Option<InstancedRenderer>; 2],

    /// Last pointer position, logical pixels.
    pointer: Option<(f32, f32)>,
}

impl<K> fmt::Debug for GraphView<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("size", &self.size)
            .field("points", &self.points.as_ref().map(|p| p.len()))
            .field("layers", &self.layers.len())
            .field("mode", &self.scheduler.mode())
            .finish()
    }
}

impl<K> GraphView<K>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    pub fn new(config: ViewConfig, size: ViewSize) -> Self {
        let (w, h) = size.physical();
        let mut camera = OrbitCamera::new();
        camera.set_aspect(size.aspect());
        Self {
            config,
            size,
            points: None,
            palette: Palette::default(),
            router: PickingRouter::new(),
            picking_target: PickingTarget::new(w, h),
            scheduler: RenderScheduler::new(config.scheduler),
            queued: FramePlan::empty(),
            camera,
            transform: GraphTransform::IDENTITY,
            params: config.params.sanitized(),
            resolve: ResolvePass::new(),
            layers: Vec::new(),
            next_layer: 0,
            frame: None,
            renderers: [None, None],
            pointer: None,
        }
    }

    // ── data ──────────────────────────────────────────────────────────────

    /// Replaces the point set. Every layer referenced the old rows and is
    /// dropped; the camera is framed on the new bounds.
    pub fn set_points(&mut self, points: DensePointStore<K>) {
        let dropped = self.layers.len();
        for layer in std::mem::take(&mut self.layers) {
            self.release_layer(layer);
        }
        if let Some(mut old) = self.points.take() {
            old.dispose();
        }
        if dropped > 0 {
            log::info!("point set replaced, {dropped} layers dropped");
        }

        self.camera.frame_bounds(&points.bounds());
        self.points = Some(points);
        self.render();
    }

    pub fn points(&self) -> Option<&DensePointStore<K>> {
        self.points.as_ref()
    }

    pub fn add_nodes(&mut self, ctx: DeviceCtx<'_>, nodes: &[Node<K>]) -> Result<LayerId> {
        self.add_layer::<NodeClass>(ctx, nodes, MappingTable::new())
    }

    pub fn add_edges(&mut self, ctx: DeviceCtx<'_>, edges: &[Edge<K>]) -> Result<LayerId> {
        self.add_layer::<EdgeClass>(ctx, edges, MappingTable::new())
    }

    /// Packs `records` with the class mappings (replaced by `overrides`
    /// where given), resolves them on the GPU and adds the layer on top.
    ///
    /// On failure the layer's picking ids are returned and nothing is added.
    pub fn add_layer<C>(
        &mut self,
        ctx: DeviceCtx<'_>,
        records: &[C::Record],
        overrides: MappingTable<C::Record>,
    ) -> Result<LayerId>
    where
        C: EntityClass<K> + 'static,
        C::Record: 'static,
    {
        let points = self
            .points
            .as_mut()
            .context("points must be set before adding layers")?;

        let keys = records.iter().map(C::key).collect();
        let handle = self.router.register(keys)?;
        let colors = self
            .router
            .allocation(handle)
            .map(|a| a.colors().to_vec())
            .unwrap_or_default();

        let program = C::program();
        let mut mappings = C::default_mappings(&points.index());
        mappings.extend(overrides);
        mappings.set_fn("picking", move |_: &C::Record, i| {
            Ok(colors.get(i * 4..i * 4 + 4).map(|c| Value::from([c[0], c[1], c[2], c[3]])))
        });

        let scale = match C::KIND {
            LayerKind::Nodes => self.config.node_scale,
            LayerKind::Edges => self.config.edge_scale,
        };

        let resolved = pack(records, &program.source_schema(), &mappings, PackOptions::default())
            .with_context(|| format!("{} ingestion failed", C::KIND.label()))
            .and_then(|source| {
                let buffer = points.upload(ctx.device);
                self.resolve
                    .compute(ctx, buffer, &source, program, [scale, 0.0, 0.0, 0.0])
            });
        let resolved = match resolved {
            Ok(r) => r,
            Err(e) => {
                self.router.release(handle);
                return Err(e);
            }
        };

        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        log::info!(
            "{} layer {:?}: {} records, {} rows",
            C::KIND.label(),
            id,
            records.len(),
            resolved.data_rows
        );
        self.layers.push(Layer {
            id,
            kind: C::KIND,
            picking: handle,
            resolved,
        });
        self.render();
        Ok(id)
    }

    /// Returns `false` for unknown ids.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(at) = self.layers.iter().position(|l| l.id == id) else {
            log::debug!("remove of unknown layer {id:?}");
            return false;
        };
        let layer = self.layers.remove(at);
        self.release_layer(layer);
        self.render();
        true
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    /// Resolved rows of a layer, mainly for inspection and tests.
    pub fn resolved(&self, id: LayerId) -> Option<&ResolvedBuffer> {
        self.layers.iter().find(|l| l.id == id).map(|l| &l.resolved)
    }

    fn release_layer(&mut self, layer: Layer) {
        self.router.release(layer.picking);
        layer.resolved.buffer.destroy();
    }

    // ── appearance ────────────────────────────────────────────────────────

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Register colors here; entities refer to them by index.
    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Call [`render`](Self::render) after changing the camera.
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn transform(&self) -> GraphTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: GraphTransform) {
        self.transform = transform;
        self.render();
    }

    pub fn params(&self) -> FrameParams {
        self.params
    }

    pub fn set_params(&mut self, params: FrameParams) {
        self.params = params.sanitized();
        self.render();
    }

    // ── scheduling ────────────────────────────────────────────────────────

    /// Requests a fresh draft frame; see [`RenderScheduler::render`].
    pub fn render(&mut self) -> bool {
        self.queued = FramePlan::empty();
        self.scheduler.render()
    }

    pub fn schedule_render(&mut self, now: Instant, delay: Duration) -> Option<TimerToken> {
        self.scheduler.schedule_render(now, delay)
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// A frame should be drawn: a render was requested or a refinement
    /// fired.
    pub fn wants_frame(&self) -> bool {
        self.scheduler.frame_pending() || !self.queued.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.pending_timer().map(|(_, at)| at)
    }

    /// Fires the pending timer if due; its passes are drawn on the next frame.
    pub fn on_timer(&mut self, now: Instant) {
        let plan = self.scheduler.fire_due(now);
        if !plan.is_empty() {
            self.queued = plan;
        }
    }

    /// Passes to record for this frame: the draft and picking passes of a
    /// pending render, else queued refinement passes.
    pub fn on_animation_frame(&mut self, now: Instant) -> FramePlan {
        if self.scheduler.frame_pending() {
            self.queued = FramePlan::empty();
            self.scheduler.on_animation_frame(now)
        } else {
            std::mem::take(&mut self.queued)
        }
    }

    // ── geometry ──────────────────────────────────────────────────────────

    pub fn size(&self) -> ViewSize {
        self.size
    }

    pub fn picking_target(&self) -> &PickingTarget {
        &self.picking_target
    }

    /// Propagates a new view size to the camera aspect, the picking target
    /// and the pointer transform, then requests a render.
    ///
    /// The runtime has already reconfigured the surface.
    pub fn resize(&mut self, size: ViewSize) {
        let (w, h) = size.physical();
        self.size = size;
        self.camera.set_aspect(size.aspect());
        self.picking_target.resize(w, h);
        self.render();
    }

    // ── pointer ───────────────────────────────────────────────────────────

    /// Pointer moved to `(x, y)` in logical pixels.
    ///
    /// Reads the picking pixel under it and updates hover state. Nothing
    /// happens before the first picking frame.
    pub fn pointer_moved(&mut self, ctx: DeviceCtx<'_>, x: f32, y: f32) -> Result<()> {
        self.pointer = Some((x, y));
        let Some(rgba) = self.pick_at(ctx, x, y)? else { return Ok(()) };
        self.router.pointer_moved(rgba);
        Ok(())
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
        self.router.pointer_left();
    }

    /// Click at the last pointer position.
    pub fn clicked(&mut self, ctx: DeviceCtx<'_>) -> Result<()> {
        let Some((x, y)) = self.pointer else { return Ok(()) };
        if let Some(rgba) = self.pick_at(ctx, x, y)? {
            self.router.click(rgba);
        }
        Ok(())
    }

    pub fn hovered(&self) -> Option<&K> {
        self.router.hovered()
    }

    pub fn drain_events(&mut self) -> Vec<PickEvent<K>> {
        self.router.drain_events()
    }

    /// Color under the pointer; all-zero outside the view.
    fn pick_at(&mut self, ctx: DeviceCtx<'_>, x: f32, y: f32) -> Result<Option<[u8; 4]>> {
        match self.size.to_device_pixel(x, y) {
            Some((px, py)) => self.picking_target.read_pixel(ctx, px, py),
            None => Ok(Some([0; 4])),
        }
    }

    // ── recording ─────────────────────────────────────────────────────────

    /// Records `plan`: surface passes into `target`, picking passes into the
    /// picking target.
    pub fn record(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        plan: &FramePlan,
    ) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        self.palette.ensure_gpu(ctx.device, ctx.queue)?;

        let frame = self.frame.get_or_insert_with(|| FrameBindings::new(ctx.device));
        if !frame.ensure_bind_group(ctx.device, &self.palette) {
            return Ok(());
        }

        let uniforms = FrameUniforms::new(
            self.camera.view(),
            self.camera.projection(),
            self.transform.matrix(),
            self.config.background,
            ctx.viewport,
            ctx.scale_factor,
            plan.passes()[0].mode,
            self.params,
        );
        for pass in plan.passes() {
            frame.write(ctx.queue, pass.mode, &uniforms);
        }

        for kind in LayerKind::ALL {
            if !self.layers.iter().any(|l| l.kind == kind) {
                continue;
            }
            let slot = &mut self.renderers[kind.index()];
            if slot.is_none() {
                *slot = Some(create_renderer(kind)?);
            }
            if let Some(renderer) = slot.as_mut() {
                renderer.prepare(ctx, frame);
            }
        }

        for pass in plan.passes() {
            let (view, clear) = match pass.target {
                PassTarget::Surface => (target.color_view, self.config.background.to_wgpu_linear()),
                PassTarget::Picking => (self.picking_target.ensure(ctx.device), wgpu::Color::TRANSPARENT),
            };
            let load = if pass.clear {
                wgpu::LoadOp::Clear(clear)
            } else {
                wgpu::LoadOp::Load
            };

            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("loom graph pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for layer in &self.layers {
                if let Some(renderer) = self.renderers[layer.kind.index()].as_ref() {
                    renderer.draw(&mut rpass, frame, pass.mode, &layer.resolved);
                }
            }
        }
        log::trace!("recorded {} passes", plan.passes().len());
        Ok(())
    }
}

fn create_renderer(kind: LayerKind) -> Result<InstancedRenderer> {
    let instances = InstanceLayout::from_layout(&kind.program().target_layout(), 1)
        .with_context(|| format!("{} instance layout", kind.label()))?;
    Ok(InstancedRenderer::new(kind.label(), kind.shader(), instances))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::device::{read_buffer, test_gpu, HeadlessGpu};
    use crate::picking::{decode, ID_SPACE};
    use crate::points::Point;
    use crate::schedule::{RenderMode, RenderPass};

    fn minimal_points() -> DensePointStore<&'static str> {
        DensePointStore::from_points(&[
            Point::new("a", -8.6, 5.0, 0.0),
            Point::new("b", 8.6, 5.0, 0.0),
            Point::new("c", 0.0, -10.0, 0.0),
            Point::new("d", 0.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    /// Every pair of the four points.
    fn minimal_edges() -> Vec<Edge<&'static str>> {
        ["ab", "ac", "ad", "bc", "bd", "cd"]
            .into_iter()
            .map(|id| Edge::new(id, &id[..1], &id[1..]))
            .collect()
    }

    /// Records `plan` into a 64×64 target and returns its RGBA8 rows.
    fn render_offscreen(view: &mut GraphView<&'static str>, gpu: &HeadlessGpu, plan: &FramePlan) -> Vec<u8> {
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let extent = wgpu::Extent3d {
            width: 64,
            height: 64,
            depth_or_array_layers: 1,
        };
        let color = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("test surface"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let pixels = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("test pixels"),
            size: 64 * 256,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), format, Viewport::new(64.0, 64.0), 1.0);
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        view.record(&ctx, &mut RenderTarget::new(&mut encoder, &color_view), plan)
            .unwrap();
        encoder.copy_texture_to_buffer(
            color.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &pixels,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(256),
                    rows_per_image: Some(64),
                },
            },
            extent,
        );
        gpu.queue().submit(std::iter::once(encoder.finish()));
        read_buffer(gpu.device(), gpu.queue(), &pixels, 64 * 256).unwrap()
    }

    fn pixel(rows: &[u8], x: usize, y: usize) -> [u8; 4] {
        let at = y * 256 + x * 4;
        [rows[at], rows[at + 1], rows[at + 2], rows[at + 3]]
    }

    fn modes(plan: &FramePlan) -> Vec<RenderMode> {
        plan.passes().iter().map(|p| p.mode).collect()
    }

    #[test]
    fn resize_reaches_camera_and_picking_target() {
        let mut view: GraphView<u32> =
            GraphView::new(ViewConfig::default(), ViewSize::new(800.0, 600.0, 1.0));
        assert_eq!(view.picking_target().size(), (800, 600));
        assert!(!view.wants_frame());

        view.resize(ViewSize::new(300.0, 200.0, 2.0));
        assert_eq!(view.picking_target().size(), (600, 400));
        assert!((view.camera().aspect() - 1.5).abs() < 1e-6);
        assert!(view.wants_frame());

        let plan = view.on_animation_frame(Instant::now());
        assert_eq!(modes(&plan), vec![RenderMode::Draft, RenderMode::Picking]);
    }

    #[test]
    fn timer_refinement_is_queued_for_next_frame() {
        let mut view = GraphView::new(ViewConfig::default(), ViewSize::new(100.0, 100.0, 1.0));
        view.set_points(minimal_points());
        assert!(view.wants_frame());

        let t0 = Instant::now();
        view.on_animation_frame(t0);
        assert!(!view.wants_frame());
        let due = view.next_deadline().unwrap();
        assert_eq!(due, t0 + Duration::from_millis(85));

        view.on_timer(t0);
        assert!(!view.wants_frame());
        view.on_timer(due);
        assert!(view.wants_frame());
        assert_eq!(modes(&view.on_animation_frame(due)), vec![RenderMode::Medium]);

        // A render request drops queued refinement.
        let high = view.next_deadline().unwrap();
        view.on_timer(high);
        view.render();
        assert_eq!(
            modes(&view.on_animation_frame(high)),
            vec![RenderMode::Draft, RenderMode::Picking]
        );
    }

    #[test]
    fn set_points_frames_camera_on_bounds() {
        let mut view = GraphView::new(ViewConfig::default(), ViewSize::new(100.0, 100.0, 1.0));
        view.set_points(minimal_points());
        let target = view.camera().target;
        assert!((target.x).abs() < 1e-5);
        assert!((target.y + 2.5).abs() < 1e-5);
        assert_eq!(view.points().map(|p| p.len()), Some(4));
    }

    #[test]
    fn minimal_graph_resolves_edges_and_nodes() {
        let Some(gpu) = test_gpu() else { return };
        let mut view = GraphView::new(ViewConfig::default(), ViewSize::new(64.0, 64.0, 1.0));
        view.set_points(minimal_points());

        let edges = view.add_edges(gpu.ctx(), &minimal_edges()).unwrap();
        let packed = view.resolved(edges).unwrap().read_back(gpu.ctx()).unwrap();
        assert_eq!(packed.rows(), 6);
        for row in 0..6 {
            let start: Vec<f64> = (0..3).map(|c| packed.read(row, "start", c).unwrap()).collect();
            let end: Vec<f64> = (0..3).map(|c| packed.read(row, "end", c).unwrap()).collect();
            assert_ne!(start, end, "row {row} is degenerate");
            assert_eq!(packed.read(row, "colors", 0), Some(0.0));
            assert_eq!(packed.read(row, "colors", 1), Some(0.0));
            assert_eq!(packed.read(row, "t", 1), Some(1.0));

            let bytes = packed.row(row).unwrap();
            let picking = [bytes[44], bytes[45], bytes[46], bytes[47]];
            let key = view.router.resolve_color(picking).copied();
            assert_eq!(key, Some(minimal_edges()[row].id));
            assert!(decode(picking).is_some());
        }
        assert_eq!(packed.read(0, "start", 0), Some(-8.6f32 as f64));
        assert_eq!(packed.read(0, "end", 0), Some(8.6f32 as f64));

        let nodes: Vec<_> = ["a", "b", "c", "d"].into_iter().map(|p| Node::new(p, p)).collect();
        let layer = view.add_nodes(gpu.ctx(), &nodes).unwrap();
        let packed = view.resolved(layer).unwrap().read_back(gpu.ctx()).unwrap();
        assert_eq!(packed.rows(), 4);
        assert_eq!(packed.read(2, "position", 1), Some(-10.0));
        assert_eq!(packed.read(3, "radius", 0), Some(1.0));
        assert_eq!(view.layer_ids(), vec![edges, layer]);
    }

    #[test]
    fn failed_layer_returns_picking_ids() {
        let Some(gpu) = test_gpu() else { return };
        let mut view = GraphView::new(ViewConfig::default(), ViewSize::new(64.0, 64.0, 1.0));

        let err = view.add_nodes(gpu.ctx(), &[Node::new("n", "a")]).unwrap_err();
        assert!(err.to_string().contains("points must be set"));

        view.set_points(minimal_points());
        let err = view
            .add_nodes(gpu.ctx(), &[Node::new("n", "a"), Node::new("m", "nowhere")])
            .unwrap_err();
        assert!(format!("{err:#}").contains("unknown point id \"nowhere\""));
        assert_eq!(view.router.allocator().available(), ID_SPACE as u64);
        assert!(view.layer_ids().is_empty());
    }

    #[test]
    fn second_high_pass_adds_edge_falloff() {
        let Some(gpu) = test_gpu() else { return };
        let mut view = GraphView::new(ViewConfig::default(), ViewSize::new(64.0, 64.0, 1.0));
        view.set_points(
            DensePointStore::from_points(&[
                Point::new("l", -5.0, 0.0, 0.0),
                Point::new("r", 5.0, 0.0, 0.0),
            ])
            .unwrap(),
        );
        view.add_edges(gpu.ctx(), &[Edge::new("e", "l", "r").with_width(6.0)])
            .unwrap();

        let core_only = FramePlan::new(vec![RenderPass::surface(RenderMode::HighPass1, true)]);
        let both = FramePlan::new(vec![
            RenderPass::surface(RenderMode::HighPass1, true),
            RenderPass::surface(RenderMode::HighPass2, false),
        ]);
        let first = render_offscreen(&mut view, &gpu, &core_only);
        let second = render_offscreen(&mut view, &gpu, &both);

        // The edge runs along row 32; row 33 is inside the core, row 35 is
        // 3.5px off the center line, past the 3px half width.
        assert_eq!(pixel(&first, 32, 33), pixel(&second, 32, 33));
        assert_eq!(pixel(&first, 32, 35), pixel(&first, 32, 60));
        assert!(pixel(&second, 32, 35)[0] > pixel(&first, 32, 35)[0]);
    }

    #[test]
    fn pointer_over_node_hovers_and_clicks() {
        let Some(gpu) = test_gpu() else { return };
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let size = ViewSize::new(64.0, 64.0, 1.0);

        let mut view = GraphView::new(ViewConfig::default(), size);
        view.set_points(DensePointStore::from_points(&[Point::new("p", 0.0, 0.0, 0.0)]).unwrap());
        view.add_nodes(gpu.ctx(), &[Node::new("n", "p")]).unwrap();

        let color = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("test surface"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), format, Viewport::new(64.0, 64.0), 1.0);
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let plan = view.on_animation_frame(Instant::now());
        assert!(plan.draws_picking());
        view.record(&ctx, &mut RenderTarget::new(&mut encoder, &color_view), &plan)
            .unwrap();
        gpu.queue().submit(std::iter::once(encoder.finish()));

        view.pointer_moved(gpu.ctx(), 32.0, 32.0).unwrap();
        assert_eq!(view.hovered(), Some(&"n"));
        view.clicked(gpu.ctx()).unwrap();
        view.pointer_moved(gpu.ctx(), 1.0, 1.0).unwrap();
        view.clicked(gpu.ctx()).unwrap();
        view.pointer_moved(gpu.ctx(), 500.0, 1.0).unwrap();
        assert_eq!(
            view.drain_events(),
            vec![
                PickEvent::HoverOn("n"),
                PickEvent::Click("n"),
                PickEvent::HoverOff("n"),
            ]
        );
    }
}
