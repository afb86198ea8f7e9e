//! Window-system independent input events.
//!
//! The engine translates winit events into these so the frame loop and its
//! tests never depend on a live window.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
    /// Hold to pause
    K,
    /// Quit
    Q,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Repeated,
    Released,
}

impl KeyState {
    /// Press or auto-repeat
    pub fn is_down(self) -> bool {
        matches!(self, KeyState::Pressed | KeyState::Repeated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        state: KeyState,
        shift: bool,
    },
    PointerButton {
        button: PointerButton,
        state: ButtonState,
    },
    /// Absolute cursor position in window pixels
    PointerMoved { x: f64, y: f64 },
    /// Raw relative motion, +dy pointing down the screen
    PointerMotion { dx: f64, dy: f64 },
    Scroll { dy: f64 },
    CloseRequested,
}
