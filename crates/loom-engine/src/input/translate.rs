use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};

use super::state::PointerState;
use super::types::{ButtonState, MouseButton, PointerEvent};

/// Translates a winit event into a [`PointerEvent`].
///
/// Returns `None` for events the pointer subsystem does not represent.
pub fn translate_window_event(
    scale_factor: f64,
    state: &PointerState,
    event: &WindowEvent,
) -> Option<PointerEvent> {
    match event {
        WindowEvent::CursorLeft { .. } => Some(PointerEvent::Left),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical_f32(scale_factor, *position);
            Some(PointerEvent::Moved { x, y })
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let st = match st {
                ElementState::Pressed => ButtonState::Pressed,
                ElementState::Released => ButtonState::Released,
            };
            // winit reports no position with buttons.
            let (x, y) = state.position?;
            Some(PointerEvent::Button {
                button: map_mouse_button(*button),
                state: st,
                x,
                y,
            })
        }

        WindowEvent::MouseWheel { delta, .. } => Some(match delta {
            MouseScrollDelta::LineDelta(x, y) => PointerEvent::Wheel { dx: *x, dy: *y, pixels: false },
            MouseScrollDelta::PixelDelta(p) => {
                let (dx, dy) = to_logical_f32(scale_factor, *p);
                PointerEvent::Wheel { dx, dy, pixels: true }
            }
        }),

        _ => None,
    }
}

fn to_logical_f32(scale_factor: f64, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(scale_factor);
    (logical.x as f32, logical.y as f32)
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}
