use std::time::Instant;

use anyhow::Result;
use loom_engine::core::{App, AppControl, EventCtx, FrameCtx};
use loom_engine::device::{DeviceCtx, GpuInit};
use loom_engine::graph::{Edge, EdgeClass, GraphView, Node, ViewConfig};
use loom_engine::input::{MouseButton, PointerEvent};
use loom_engine::logging::{init_logging, LoggingConfig};
use loom_engine::picking::PickEvent;
use loom_engine::points::{DensePointStore, Point};
use loom_engine::window::{CursorIcon, Runtime, RuntimeConfig};
use loom_layout::{MappingTable, Value};
use winit::event::WindowEvent;
use winit::window::WindowId;

/// `(id, x, y, z)` of the demo points.
const POINTS: [(&str, f32, f32, f32); 4] = [
    ("a", -8.6, 5.0, 0.0),
    ("b", 8.6, 5.0, 0.0),
    ("c", 0.0, -10.0, 0.0),
    ("d", 0.0, 0.0, 0.0),
];

#[derive(Default)]
struct Viewer {
    view: Option<GraphView<&'static str>>,
}

impl Viewer {
    fn load(view: &mut GraphView<&'static str>, ctx: DeviceCtx<'_>) -> Result<()> {
        let points: Vec<_> = POINTS
            .iter()
            .map(|&(id, x, y, z)| Point::new(id, x, y, z).with_radius(0.8))
            .collect();
        view.set_points(DensePointStore::from_points(&points)?);

        let palette = view.palette_mut();
        let colors = [
            palette.register("#e4572e")?,
            palette.register("#29335c")?,
            palette.register("#f3a712")?,
            palette.register("#a8c686")?,
        ];

        let edges: Vec<_> = ["ab", "ac", "ad", "bc", "bd", "cd"]
            .into_iter()
            .map(|id| Edge::new(id, &id[..1], &id[1..]).with_width(3.0))
            .collect();
        // Color each edge end after the point it touches.
        let mut overrides = MappingTable::new();
        overrides.set_fn("colors", move |e: &Edge<&'static str>, _| {
            let of = |p: &str| colors[POINTS.iter().position(|q| q.0 == p).unwrap_or(0)];
            Ok(Some(Value::from([of(e.source), of(e.target)])))
        });
        view.add_layer::<EdgeClass>(ctx, &edges, overrides)?;

        let nodes: Vec<_> = POINTS
            .iter()
            .zip(colors)
            .map(|(&(id, ..), color)| Node::new(id, id).with_color(color))
            .collect();
        view.add_nodes(ctx, &nodes)?;
        Ok(())
    }

    fn log_pick_events(view: &mut GraphView<&'static str>) -> bool {
        let mut hovering = view.hovered().is_some();
        for ev in view.drain_events() {
            match ev {
                PickEvent::HoverOn(id) => {
                    log::info!("hover on {id}");
                    hovering = true;
                }
                PickEvent::HoverOff(id) => log::info!("hover off {id}"),
                PickEvent::Click(id) => log::info!("click {id}"),
            }
        }
        hovering
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, ctx: &mut EventCtx<'_, '_>, event: &WindowEvent) -> AppControl {
        let Some(view) = self.view.as_mut() else {
            return AppControl::Continue;
        };

        match event {
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                view.resize(ctx.window.view_size());
            }
            _ => {}
        }

        let result = match ctx.pointer_event {
            Some(PointerEvent::Moved { x, y }) => view.pointer_moved(ctx.device(), x, y),
            Some(PointerEvent::Left) => {
                view.pointer_left();
                Ok(())
            }
            Some(PointerEvent::Wheel { dy, pixels, .. }) => {
                let lines = if pixels { dy / 40.0 } else { dy };
                view.camera_mut().zoom(0.9f32.powf(lines));
                view.render();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("picking read failed: {e:#}");
        }

        if ctx.click.is_some_and(|c| c.button == MouseButton::Left) {
            if let Err(e) = view.clicked(ctx.device()) {
                log::warn!("picking read failed: {e:#}");
            }
        }

        let cursor = if Self::log_pick_events(view) {
            CursorIcon::Pointer
        } else {
            CursorIcon::Default
        };
        ctx.window.set_cursor(cursor);
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let view = match self.view.as_mut() {
            Some(view) => view,
            None => {
                let mut view = GraphView::new(ViewConfig::default(), ctx.window.view_size());
                if let Err(e) = Self::load(&mut view, ctx.gpu.ctx()) {
                    log::error!("failed to load demo graph: {e:#}");
                    return AppControl::Exit;
                }
                self.view.insert(view)
            }
        };

        let plan = view.on_animation_frame(Instant::now());
        if plan.is_empty() {
            return AppControl::Continue;
        }
        ctx.render(|rctx, target| view.record(rctx, target, &plan))
    }

    fn on_timer(&mut self, _window_id: WindowId, now: Instant) -> AppControl {
        if let Some(view) = self.view.as_mut() {
            view.on_timer(now);
        }
        AppControl::Continue
    }

    fn wants_frame(&self, _window_id: WindowId) -> bool {
        self.view.as_ref().is_none_or(|v| v.wants_frame())
    }

    fn next_deadline(&self, _window_id: WindowId) -> Option<Instant> {
        self.view.as_ref().and_then(|v| v.next_deadline())
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::quiet_backend());

    Runtime::run(
        RuntimeConfig {
            title: "loom viewer".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Viewer::default(),
    )
}
