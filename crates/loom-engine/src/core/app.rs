use std::time::Instant;

use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::{EventCtx, FrameCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Redraws are on demand: the runtime asks [`wants_frame`](App::wants_frame)
/// after every batch of events and sleeps until
/// [`next_deadline`](App::next_deadline) otherwise.
pub trait App {
    /// Called for window events. Resizes reach the GPU surface before this.
    fn on_window_event(&mut self, ctx: &mut EventCtx<'_, '_>, event: &WindowEvent) -> AppControl {
        let _ = (ctx, event);
        AppControl::Continue
    }

    /// Called for each redraw of a window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once the window's deadline has passed.
    fn on_timer(&mut self, window_id: WindowId, now: Instant) -> AppControl {
        let _ = (window_id, now);
        AppControl::Continue
    }

    fn wants_frame(&self, window_id: WindowId) -> bool;

    fn next_deadline(&self, window_id: WindowId) -> Option<Instant> {
        let _ = window_id;
        None
    }
}
