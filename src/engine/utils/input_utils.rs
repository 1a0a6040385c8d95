use winit::event::{ElementState, MouseButton as WinitMouseButton};
use winit::keyboard::{Key as WinitKey, NamedKey};

/// Keys the viewer reacts to. Printable keys keep their case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Press,
    Release,
}

impl Key {
    pub fn from_winit(key: &WinitKey) -> Option<Self> {
        match key {
            WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
            WinitKey::Named(NamedKey::Enter) => Some(Key::Enter),
            WinitKey::Named(NamedKey::Space) => Some(Key::Space),
            WinitKey::Named(NamedKey::Tab) => Some(Key::Tab),
            WinitKey::Named(NamedKey::Backspace) => Some(Key::Backspace),
            WinitKey::Named(NamedKey::ArrowUp) => Some(Key::Up),
            WinitKey::Named(NamedKey::ArrowDown) => Some(Key::Down),
            WinitKey::Named(NamedKey::ArrowLeft) => Some(Key::Left),
            WinitKey::Named(NamedKey::ArrowRight) => Some(Key::Right),
            WinitKey::Character(text) => text.chars().next().map(Key::Char),
            _ => None,
        }
    }
}

impl MouseButton {
    pub fn from_winit(button: WinitMouseButton) -> Option<Self> {
        match button {
            WinitMouseButton::Left => Some(MouseButton::Left),
            WinitMouseButton::Right => Some(MouseButton::Right),
            WinitMouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

impl From<ElementState> for KeyState {
    fn from(state: ElementState) -> Self {
        match state {
            ElementState::Pressed => KeyState::Press,
            ElementState::Released => KeyState::Release,
        }
    }
}
