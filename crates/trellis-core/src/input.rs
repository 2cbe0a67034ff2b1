#![forbid(unsafe_code)]

//! Input vocabulary shared by the widget layer.
//!
//! Only the shapes the bindable controls consume; mapping from any real
//! input backend is the embedder's job.

use bitflags::bitflags;

use crate::event::{Event, EventPublisher};

bitflags! {
    /// Keyboard modifier state accompanying a key press.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Logical keys the controls care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character as delivered by the input backend.
    Char(char),
    Backspace,
    Delete,
    Return,
    Escape,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

/// A key press with its modifier state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    #[must_use]
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A key press with no modifiers held.
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// An unmodified printable character.
    #[must_use]
    pub const fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    #[must_use]
    pub fn shift(self) -> Self {
        Self::new(self.key, self.modifiers | Modifiers::SHIFT)
    }

    #[must_use]
    pub fn control(self) -> Self {
        Self::new(self.key, self.modifiers | Modifiers::CONTROL)
    }

    #[must_use]
    pub fn alt(self) -> Self {
        Self::new(self.key, self.modifiers | Modifiers::ALT)
    }
}

/// Mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A mouse press/release at a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseInput {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
}

pub type KeyEvent = Event<KeyInput>;
pub type KeyEventPublisher = EventPublisher<KeyInput>;

pub type MouseEvent = Event<MouseInput>;
pub type MouseEventPublisher = EventPublisher<MouseInput>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_builders_accumulate() {
        let input = KeyInput::char('a').shift().control();
        assert_eq!(input.key, Key::Char('a'));
        assert!(input.modifiers.contains(Modifiers::SHIFT | Modifiers::CONTROL));
        assert!(!input.modifiers.contains(Modifiers::ALT));
    }

    #[test]
    fn plain_input_has_no_modifiers() {
        assert_eq!(KeyInput::plain(Key::Return).modifiers, Modifiers::empty());
    }
}
