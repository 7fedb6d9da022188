//! Input Translation Module
//!
//! Maps host keyboard events onto console actions:
//!
//! - Up/Down browse the history, Left/Right move the cursor
//! - PageUp/PageDown scroll the renderer
//! - Backspace, Delete and Enter become control characters
//! - F10 toggles the overlay slide, Escape quits
//! - Printable characters are inserted
//!
//! Hosts that report keys by name (SDL style, `"page up"`, `"f10"`) can use
//! [`Key::from_name`].

use crate::core::{Console, ReadlineCommand, BACKSPACE, CARRIAGE_RETURN, DELETE};
use crate::renderer::ScrollDirection;

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Check if any modifier is pressed
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt
    }

    /// Ctrl or Alt, which turn a character into a shortcut
    pub fn is_shortcut(&self) -> bool {
        self.ctrl || self.alt
    }
}

/// Keys the console reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    // Cursor keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    PageUp,
    PageDown,

    // Editing
    Backspace,
    Delete,
    Enter,

    Escape,
    F10,

    /// Printable character
    Char(char),
}

impl Key {
    /// Parse a host key name, case-insensitive
    ///
    /// Single characters map to [`Key::Char`].
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }

        let key = match name.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "page up" | "pageup" | "pgup" => Key::PageUp,
            "page down" | "pagedown" | "pgdn" => Key::PageDown,
            "backspace" | "bs" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "return" | "enter" => Key::Enter,
            "escape" | "esc" => Key::Escape,
            "f10" => Key::F10,
            "space" => Key::Char(' '),
            _ => return None,
        };
        Some(key)
    }
}

/// What a key press asks the host to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Feed a character code to [`Console::put_character`]
    Character(char),
    /// Feed a readline command to [`Console::readline_command`]
    Readline(ReadlineCommand),
    /// Scroll the renderer's viewport
    Scroll(ScrollDirection),
    /// Show or hide the overlay
    ToggleSlide,
    Quit,
}

impl InputAction {
    /// Apply console-level actions
    ///
    /// Returns `false` for actions the host has to handle itself.
    pub fn apply(self, console: &mut Console) -> bool {
        match self {
            InputAction::Character(c) => console.put_character(c),
            InputAction::Readline(command) => console.readline_command(command),
            InputAction::Scroll(_) | InputAction::ToggleSlide | InputAction::Quit => return false,
        }
        true
    }
}

/// Translate a key press into a console action
pub fn translate_key(key: Key, modifiers: Modifiers) -> Option<InputAction> {
    let action = match key {
        Key::Up => InputAction::Readline(ReadlineCommand::HistoryPrev),
        Key::Down => InputAction::Readline(ReadlineCommand::HistoryNext),
        Key::Left => InputAction::Readline(ReadlineCommand::CursorLeft),
        Key::Right => InputAction::Readline(ReadlineCommand::CursorRight),
        Key::PageUp => InputAction::Scroll(ScrollDirection::Up),
        Key::PageDown => InputAction::Scroll(ScrollDirection::Down),
        Key::Backspace => InputAction::Character(BACKSPACE),
        Key::Delete => InputAction::Character(DELETE),
        Key::Enter => InputAction::Character(CARRIAGE_RETURN),
        Key::Escape => InputAction::Quit,
        Key::F10 => InputAction::ToggleSlide,
        Key::Char(c) => {
            if modifiers.is_shortcut() || c.is_control() {
                return None;
            }
            InputAction::Character(c)
        }
    };
    Some(action)
}
