//! Pointer input.
//!
//! Public types do not expose winit; the runtime translates platform events
//! with [`translate_window_event`].

mod state;
mod translate;
mod types;

pub use state::{Click, PointerState};
pub use translate::translate_window_event;
pub use types::{ButtonState, MouseButton, PointerEvent};
