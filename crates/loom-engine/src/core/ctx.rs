use anyhow::Result;
use winit::window::{CursorIcon, Window, WindowId};

use crate::coords::{ViewSize, Viewport};
use crate::device::{DeviceCtx, Gpu, SurfaceErrorAction};
use crate::input::{Click, PointerEvent, PointerState};
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Logical size plus scale factor.
    pub fn view_size(&self) -> ViewSize {
        let phys = self.window.inner_size();
        ViewSize::from_physical(phys.width, phys.height, self.window.scale_factor())
    }

    pub fn set_cursor(&self, cursor: CursorIcon) {
        self.window.set_cursor(cursor);
    }
}

/// Context passed to `core::App::on_window_event`.
pub struct EventCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a Gpu<'w>,
    pub pointer: &'a PointerState,
    /// The event translated for the pointer subsystem, if it is one.
    pub pointer_event: Option<PointerEvent>,
    /// Set when this event completed a click.
    pub click: Option<Click>,
    pub runtime: &'a mut RuntimeCtx,
}

impl EventCtx<'_, '_> {
    /// Device and queue, for picking reads.
    pub fn device(&self) -> DeviceCtx<'_> {
        self.gpu.ctx()
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub pointer: &'a PointerState,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the surface texture, calls `draw` with a ready [`RenderCtx`]
    /// and [`RenderTarget`], then presents the frame.
    ///
    /// `draw` owns every pass, clears included. A draw error is logged and
    /// whatever was recorded is still presented.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>) -> Result<()>,
    {
        let scale_factor = self.window.window.scale_factor() as f32;
        let size = self.gpu.size();

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                // Reconfigured or skipped; try again on the next redraw.
                self.window.window.request_redraw();
                return AppControl::Continue;
            }
        };

        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            Viewport::new(size.width as f32, size.height as f32),
            scale_factor,
        );

        // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
        {
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            if let Err(e) = draw(&rctx, &mut target) {
                log::error!("frame draw failed: {e:#}");
            }
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
