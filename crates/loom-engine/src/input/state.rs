use std::collections::HashSet;

use super::types::{ButtonState, MouseButton, PointerEvent};

/// A completed press + release of one button without leaving the window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Click {
    pub button: MouseButton,
    pub x: f32,
    pub y: f32,
}

/// Current pointer state for a single window.
#[derive(Debug, Default)]
pub struct PointerState {
    /// Logical pixels; `None` while the pointer is outside the window.
    pub position: Option<(f32, f32)>,
    pub buttons_down: HashSet<MouseButton>,
    /// Position of the press per held button.
    pressed_at: Vec<(MouseButton, (f32, f32))>,
}

/// Movement between press and release beyond which it is a drag, not a click.
const CLICK_SLOP: f32 = 4.0;

impl PointerState {
    /// Applies `ev`; returns the click it completes, if any.
    pub fn apply(&mut self, ev: &PointerEvent) -> Option<Click> {
        match *ev {
            PointerEvent::Moved { x, y } => {
                self.position = Some((x, y));
                None
            }
            PointerEvent::Left => {
                self.position = None;
                self.buttons_down.clear();
                self.pressed_at.clear();
                None
            }
            PointerEvent::Button { button, state, x, y } => {
                self.position = Some((x, y));
                match state {
                    ButtonState::Pressed => {
                        if self.buttons_down.insert(button) {
                            self.pressed_at.push((button, (x, y)));
                        }
                        None
                    }
                    ButtonState::Released => {
                        self.buttons_down.remove(&button);
                        let at = self.pressed_at.iter().position(|(b, _)| *b == button)?;
                        let (_, (px, py)) = self.pressed_at.swap_remove(at);
                        let moved = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                        (moved <= CLICK_SLOP).then_some(Click { button, x, y })
                    }
                }
            }
            PointerEvent::Wheel { .. } => None,
        }
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(state: ButtonState, x: f32, y: f32) -> PointerEvent {
        PointerEvent::Button { button: MouseButton::Left, state, x, y }
    }

    #[test]
    fn press_release_in_place_is_a_click() {
        let mut s = PointerState::default();
        assert_eq!(s.apply(&button(ButtonState::Pressed, 10.0, 10.0)), None);
        assert!(s.button_down(MouseButton::Left));
        let click = s.apply(&button(ButtonState::Released, 11.0, 12.0));
        assert_eq!(click, Some(Click { button: MouseButton::Left, x: 11.0, y: 12.0 }));
        assert!(!s.button_down(MouseButton::Left));
    }

    #[test]
    fn drag_and_leave_cancel_click() {
        let mut s = PointerState::default();
        s.apply(&button(ButtonState::Pressed, 0.0, 0.0));
        assert_eq!(s.apply(&button(ButtonState::Released, 30.0, 0.0)), None);

        s.apply(&button(ButtonState::Pressed, 0.0, 0.0));
        s.apply(&PointerEvent::Left);
        assert_eq!(s.position, None);
        assert_eq!(s.apply(&button(ButtonState::Released, 0.0, 0.0)), None);
    }
}
