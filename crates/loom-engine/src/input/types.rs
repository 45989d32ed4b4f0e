/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Pointer activity in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Moved { x: f32, y: f32 },
    Left,
    Button {
        button: MouseButton,
        state: ButtonState,
        x: f32,
        y: f32,
    },
    /// Lines for wheel mice, logical pixels for touchpads.
    Wheel { dx: f32, dy: f32, pixels: bool },
}
