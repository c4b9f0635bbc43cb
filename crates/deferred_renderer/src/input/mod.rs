//! Input codes and their glfw translation tables
//!
//! Key codes, modifier bits and mouse buttons are plain engine types. The
//! glfw mapping lives in static pair tables searched in either direction, so
//! adding a key is one table row.

use bitflags::bitflags;

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Semicolon,
    Apostrophe,
    LeftBracket,
    RightBracket,
    Backslash,
    GraveAccent,
    CapsLock,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    LeftSuper,
    RightSuper,
    /// Any key without an engine code
    Unknown,
}

bitflags! {
    /// Modifier keys held during a key event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyMod: u16 {
        /// Either shift key
        const SHIFT = 1 << 0;
        /// Either control key
        const CONTROL = 1 << 1;
        /// Either alt key
        const ALT = 1 << 2;
        /// Either super (logo) key
        const SUPER = 1 << 3;
        /// Caps lock active
        const CAPS_LOCK = 1 << 4;
        /// Num lock active
        const NUM_LOCK = 1 << 5;
    }
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Wheel button
    Middle,
    /// Secondary button
    Right,
    /// First extra button
    X1,
    /// Second extra button
    X2,
    /// Any further button, by its 1-based index
    Other(u8),
}

impl MouseButton {
    /// 1-based button index: left 1, middle 2, right 3
    pub const fn index(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
            Self::X1 => 4,
            Self::X2 => 5,
            Self::Other(index) => index,
        }
    }
}

const KEYS: [(glfw::Key, KeyCode); 86] = [
    (glfw::Key::A, KeyCode::A),
    (glfw::Key::B, KeyCode::B),
    (glfw::Key::C, KeyCode::C),
    (glfw::Key::D, KeyCode::D),
    (glfw::Key::E, KeyCode::E),
    (glfw::Key::F, KeyCode::F),
    (glfw::Key::G, KeyCode::G),
    (glfw::Key::H, KeyCode::H),
    (glfw::Key::I, KeyCode::I),
    (glfw::Key::J, KeyCode::J),
    (glfw::Key::K, KeyCode::K),
    (glfw::Key::L, KeyCode::L),
    (glfw::Key::M, KeyCode::M),
    (glfw::Key::N, KeyCode::N),
    (glfw::Key::O, KeyCode::O),
    (glfw::Key::P, KeyCode::P),
    (glfw::Key::Q, KeyCode::Q),
    (glfw::Key::R, KeyCode::R),
    (glfw::Key::S, KeyCode::S),
    (glfw::Key::T, KeyCode::T),
    (glfw::Key::U, KeyCode::U),
    (glfw::Key::V, KeyCode::V),
    (glfw::Key::W, KeyCode::W),
    (glfw::Key::X, KeyCode::X),
    (glfw::Key::Y, KeyCode::Y),
    (glfw::Key::Z, KeyCode::Z),
    (glfw::Key::Num0, KeyCode::Num0),
    (glfw::Key::Num1, KeyCode::Num1),
    (glfw::Key::Num2, KeyCode::Num2),
    (glfw::Key::Num3, KeyCode::Num3),
    (glfw::Key::Num4, KeyCode::Num4),
    (glfw::Key::Num5, KeyCode::Num5),
    (glfw::Key::Num6, KeyCode::Num6),
    (glfw::Key::Num7, KeyCode::Num7),
    (glfw::Key::Num8, KeyCode::Num8),
    (glfw::Key::Num9, KeyCode::Num9),
    (glfw::Key::F1, KeyCode::F1),
    (glfw::Key::F2, KeyCode::F2),
    (glfw::Key::F3, KeyCode::F3),
    (glfw::Key::F4, KeyCode::F4),
    (glfw::Key::F5, KeyCode::F5),
    (glfw::Key::F6, KeyCode::F6),
    (glfw::Key::F7, KeyCode::F7),
    (glfw::Key::F8, KeyCode::F8),
    (glfw::Key::F9, KeyCode::F9),
    (glfw::Key::F10, KeyCode::F10),
    (glfw::Key::F11, KeyCode::F11),
    (glfw::Key::F12, KeyCode::F12),
    (glfw::Key::Space, KeyCode::Space),
    (glfw::Key::Enter, KeyCode::Enter),
    (glfw::Key::Escape, KeyCode::Escape),
    (glfw::Key::Tab, KeyCode::Tab),
    (glfw::Key::Backspace, KeyCode::Backspace),
    (glfw::Key::Insert, KeyCode::Insert),
    (glfw::Key::Delete, KeyCode::Delete),
    (glfw::Key::Home, KeyCode::Home),
    (glfw::Key::End, KeyCode::End),
    (glfw::Key::PageUp, KeyCode::PageUp),
    (glfw::Key::PageDown, KeyCode::PageDown),
    (glfw::Key::Up, KeyCode::Up),
    (glfw::Key::Down, KeyCode::Down),
    (glfw::Key::Left, KeyCode::Left),
    (glfw::Key::Right, KeyCode::Right),
    (glfw::Key::Minus, KeyCode::Minus),
    (glfw::Key::Equal, KeyCode::Equal),
    (glfw::Key::Comma, KeyCode::Comma),
    (glfw::Key::Period, KeyCode::Period),
    (glfw::Key::Slash, KeyCode::Slash),
    (glfw::Key::Semicolon, KeyCode::Semicolon),
    (glfw::Key::Apostrophe, KeyCode::Apostrophe),
    (glfw::Key::LeftBracket, KeyCode::LeftBracket),
    (glfw::Key::RightBracket, KeyCode::RightBracket),
    (glfw::Key::Backslash, KeyCode::Backslash),
    (glfw::Key::GraveAccent, KeyCode::GraveAccent),
    (glfw::Key::CapsLock, KeyCode::CapsLock),
    (glfw::Key::LeftShift, KeyCode::LeftShift),
    (glfw::Key::RightShift, KeyCode::RightShift),
    (glfw::Key::LeftControl, KeyCode::LeftControl),
    (glfw::Key::RightControl, KeyCode::RightControl),
    (glfw::Key::LeftAlt, KeyCode::LeftAlt),
    (glfw::Key::RightAlt, KeyCode::RightAlt),
    (glfw::Key::LeftSuper, KeyCode::LeftSuper),
    (glfw::Key::RightSuper, KeyCode::RightSuper),
    (glfw::Key::KpEnter, KeyCode::Enter),
    (glfw::Key::Unknown, KeyCode::Unknown),
    (glfw::Key::Menu, KeyCode::Unknown),
];

const MODIFIERS: [(glfw::Modifiers, KeyMod); 6] = [
    (glfw::Modifiers::Shift, KeyMod::SHIFT),
    (glfw::Modifiers::Control, KeyMod::CONTROL),
    (glfw::Modifiers::Alt, KeyMod::ALT),
    (glfw::Modifiers::Super, KeyMod::SUPER),
    (glfw::Modifiers::CapsLock, KeyMod::CAPS_LOCK),
    (glfw::Modifiers::NumLock, KeyMod::NUM_LOCK),
];

/// Engine code of a glfw key; unmapped keys become [`KeyCode::Unknown`]
pub fn key_from_glfw(key: glfw::Key) -> KeyCode {
    KEYS.iter()
        .find(|(glfw_key, _)| *glfw_key == key)
        .map_or(KeyCode::Unknown, |(_, code)| *code)
}

/// First glfw key mapped to `code`
pub fn key_to_glfw(code: KeyCode) -> Option<glfw::Key> {
    KEYS.iter()
        .find(|(_, engine)| *engine == code)
        .map(|(glfw_key, _)| *glfw_key)
}

/// Engine modifier bits of a glfw modifier set
pub fn modifiers_from_glfw(modifiers: glfw::Modifiers) -> KeyMod {
    MODIFIERS
        .iter()
        .filter(|(glfw_mod, _)| modifiers.contains(*glfw_mod))
        .fold(KeyMod::empty(), |bits, (_, engine)| bits | *engine)
}

/// glfw modifier set of engine modifier bits
pub fn modifiers_to_glfw(modifiers: KeyMod) -> glfw::Modifiers {
    MODIFIERS
        .iter()
        .filter(|(_, engine)| modifiers.contains(*engine))
        .fold(glfw::Modifiers::empty(), |bits, (glfw_mod, _)| bits | *glfw_mod)
}

/// Engine button of a glfw mouse button
pub const fn mouse_button_from_glfw(button: glfw::MouseButton) -> MouseButton {
    match button {
        glfw::MouseButton::Button1 => MouseButton::Left,
        glfw::MouseButton::Button2 => MouseButton::Right,
        glfw::MouseButton::Button3 => MouseButton::Middle,
        glfw::MouseButton::Button4 => MouseButton::X1,
        glfw::MouseButton::Button5 => MouseButton::X2,
        glfw::MouseButton::Button6 => MouseButton::Other(6),
        glfw::MouseButton::Button7 => MouseButton::Other(7),
        glfw::MouseButton::Button8 => MouseButton::Other(8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_round_trips_mapped_keys() {
        for (glfw_key, code) in KEYS {
            if code == KeyCode::Unknown || glfw_key == glfw::Key::KpEnter {
                continue;
            }
            assert_eq!(key_from_glfw(glfw_key), code);
            assert_eq!(key_to_glfw(code), Some(glfw_key));
        }
    }

    #[test]
    fn test_keypad_enter_is_enter() {
        assert_eq!(key_from_glfw(glfw::Key::KpEnter), KeyCode::Enter);
        assert_eq!(key_to_glfw(KeyCode::Enter), Some(glfw::Key::Enter));
        assert_eq!(key_from_glfw(glfw::Key::Kp5), KeyCode::Unknown);
    }

    #[test]
    fn test_modifier_translation() {
        let glfw_mods = glfw::Modifiers::Shift | glfw::Modifiers::Alt;
        let engine = modifiers_from_glfw(glfw_mods);
        assert_eq!(engine, KeyMod::SHIFT | KeyMod::ALT);
        assert_eq!(modifiers_to_glfw(engine), glfw_mods);
        assert_eq!(modifiers_from_glfw(glfw::Modifiers::empty()), KeyMod::empty());
    }

    #[test]
    fn test_button_indices() {
        assert_eq!(mouse_button_from_glfw(glfw::MouseButton::Button1).index(), 1);
        assert_eq!(mouse_button_from_glfw(glfw::MouseButton::Button2).index(), 3);
        assert_eq!(mouse_button_from_glfw(glfw::MouseButton::Button3).index(), 2);
        assert_eq!(mouse_button_from_glfw(glfw::MouseButton::Button8).index(), 8);
    }
}
