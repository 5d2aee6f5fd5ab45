//! Input event types observed by the recorder.
//!
//! Only the events the recorder cares about are modelled: pointer button
//! transitions, pointer motion and key presses. Key events are identified by
//! a normalized key name such as `"a"`, `"enter"` or `"ctrl+z"`, which is the
//! form stored in recorded steps and accepted by [`crate::Driver::press`].

use crate::geometry::Offset;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Modifier keys held while an event was generated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Modifiers: u8 {
        /// Shift key.
        const SHIFT = 0b0000_0001;
        /// Meta / Alt key.
        const META = 0b0000_0010;
        /// Control key.
        const CONTROL = 0b0000_0100;
    }
}

impl Modifiers {
    /// Returns true if shift is held.
    #[inline]
    pub fn shift(self) -> bool {
        self.contains(Self::SHIFT)
    }

    /// Returns true if meta is held.
    #[inline]
    pub fn meta(self) -> bool {
        self.contains(Self::META)
    }

    /// Returns true if control is held.
    #[inline]
    pub fn control(self) -> bool {
        self.contains(Self::CONTROL)
    }

    /// Key name prefix for these modifiers, e.g. `"ctrl+shift+"`.
    pub fn key_prefix(self) -> String {
        let mut prefix = String::new();
        if self.control() {
            prefix.push_str("ctrl+");
        }
        if self.meta() {
            prefix.push_str("meta+");
        }
        if self.shift() {
            prefix.push_str("shift+");
        }
        prefix
    }
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Left mouse button (primary).
    #[default]
    Left,
    /// Right mouse button (secondary).
    Right,
    /// Middle mouse button (scroll wheel click).
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// A key on the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Escape key.
    Esc,
    /// Tab key.
    Tab,
    /// Shift+Tab (backtab).
    BackTab,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Insert key.
    Insert,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page Up key.
    PageUp,
    /// Page Down key.
    PageDown,
    /// Function key F1-F24.
    F(u8),
}

impl KeyCode {
    /// Returns the normalized name for this key code.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Esc => "escape".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::BackTab => "backtab".to_string(),
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Delete => "delete".to_string(),
            KeyCode::Insert => "insert".to_string(),
            KeyCode::Left => "left".to_string(),
            KeyCode::Right => "right".to_string(),
            KeyCode::Up => "up".to_string(),
            KeyCode::Down => "down".to_string(),
            KeyCode::Home => "home".to_string(),
            KeyCode::End => "end".to_string(),
            KeyCode::PageUp => "pageup".to_string(),
            KeyCode::PageDown => "pagedown".to_string(),
            KeyCode::F(n) => format!("f{n}"),
        }
    }

    /// Parses a key code from its normalized name.
    pub fn from_name(name: &str) -> Option<Self> {
        let code = match name {
            "space" => KeyCode::Char(' '),
            "enter" | "return" => KeyCode::Enter,
            "escape" | "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backtab" => KeyCode::BackTab,
            "backspace" => KeyCode::Backspace,
            "delete" => KeyCode::Delete,
            "insert" => KeyCode::Insert,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    (Some('f'), Some(_)) => {
                        let n: u8 = name[1..].parse().ok()?;
                        if !(1..=24).contains(&n) {
                            return None;
                        }
                        KeyCode::F(n)
                    }
                    _ => return None,
                }
            }
        };
        Some(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a key name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name {0:?}")]
pub struct KeyParseError(pub String);

/// A key press with its modifiers.
///
/// Serialized as its normalized name (`"ctrl+z"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyEvent {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifiers held during the press.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Creates a key event.
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Creates a key event for a plain character.
    pub const fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), Modifiers::empty())
    }

    /// Returns the normalized key name, e.g. `"ctrl+z"`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}{}", self.modifiers.key_prefix(), self.code.name())
    }

    /// Parses a normalized key name.
    pub fn parse(name: &str) -> Result<Self, KeyParseError> {
        let err = || KeyParseError(name.to_string());

        // "+" is itself a key, so "ctrl++" means ctrl and plus.
        let (prefix, key) = if name == "+" {
            ("", "+")
        } else if let Some(prefix) = name.strip_suffix("++") {
            (prefix, "+")
        } else {
            match name.rsplit_once('+') {
                Some((prefix, key)) => (prefix, key),
                None => ("", name),
            }
        };

        let mut modifiers = Modifiers::empty();
        for part in prefix.split('+').filter(|p| !p.is_empty()) {
            modifiers |= match part {
                "ctrl" | "control" => Modifiers::CONTROL,
                "meta" | "alt" => Modifiers::META,
                "shift" => Modifiers::SHIFT,
                _ => return Err(err()),
            };
        }

        let code = KeyCode::from_name(key).ok_or_else(err)?;
        Ok(Self::new(code, modifiers))
    }
}

impl FromStr for KeyEvent {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyEvent {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyEvent> for String {
    fn from(event: KeyEvent) -> Self {
        event.name()
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An input event dispatched to the application.
///
/// Pointer positions are screen coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// A mouse button was pressed.
    MouseDown {
        position: Offset,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// The pointer moved.
    MouseMove {
        position: Offset,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// A mouse button was released.
    MouseUp {
        position: Offset,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// A key was pressed.
    Key { key: KeyEvent },
}

impl InputEvent {
    /// Creates a left-button press at a screen position.
    pub fn mouse_down(x: i32, y: i32) -> Self {
        Self::MouseDown {
            position: Offset::new(x, y),
            button: MouseButton::Left,
            modifiers: Modifiers::empty(),
        }
    }

    /// Creates a left-button release at a screen position.
    pub fn mouse_up(x: i32, y: i32) -> Self {
        Self::MouseUp {
            position: Offset::new(x, y),
            button: MouseButton::Left,
            modifiers: Modifiers::empty(),
        }
    }

    /// Creates a pointer move to a screen position.
    pub fn mouse_move(x: i32, y: i32) -> Self {
        Self::MouseMove {
            position: Offset::new(x, y),
            modifiers: Modifiers::empty(),
        }
    }

    /// Creates a key press from a key name.
    pub fn key(name: &str) -> Result<Self, KeyParseError> {
        Ok(Self::Key {
            key: KeyEvent::parse(name)?,
        })
    }

    /// Returns the screen position for pointer events.
    #[must_use]
    pub fn screen_position(&self) -> Option<Offset> {
        match self {
            Self::MouseDown { position, .. }
            | Self::MouseMove { position, .. }
            | Self::MouseUp { position, .. } => Some(*position),
            Self::Key { .. } => None,
        }
    }

    /// Returns the modifiers active for this event.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::MouseDown { modifiers, .. }
            | Self::MouseMove { modifiers, .. }
            | Self::MouseUp { modifiers, .. } => *modifiers,
            Self::Key { key } => key.modifiers,
        }
    }

    /// Returns true for pointer events.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        !matches!(self, Self::Key { .. })
    }

    /// Returns the key event if this is a key press.
    #[must_use]
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key { key } => Some(key),
            _ => None,
        }
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(key: KeyEvent) -> Self {
        Self::Key { key }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MouseDown {
                position, button, ..
            } => write!(f, "MouseDown({button} at {position})"),
            Self::MouseMove { position, .. } => write!(f, "MouseMove({position})"),
            Self::MouseUp {
                position, button, ..
            } => write!(f, "MouseUp({button} at {position})"),
            Self::Key { key } => write!(f, "Key({key})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for name in ["a", "enter", "ctrl+z", "ctrl+shift+left", "f5", "space", "+", "ctrl++"] {
            let key = KeyEvent::parse(name).unwrap();
            assert_eq!(key.name(), name);
        }
    }

    #[test]
    fn test_key_aliases() {
        assert_eq!(KeyEvent::parse("esc").unwrap().name(), "escape");
        assert_eq!(
            KeyEvent::parse("control+alt+x").unwrap().name(),
            "ctrl+meta+x"
        );
    }

    #[test]
    fn test_invalid_key_names() {
        assert!(KeyEvent::parse("").is_err());
        assert!(KeyEvent::parse("hyper+a").is_err());
        assert!(KeyEvent::parse("f99").is_err());
        assert!(KeyEvent::parse("nonsense").is_err());
    }

    #[test]
    fn test_event_accessors() {
        let down = InputEvent::mouse_down(4, 7);
        assert_eq!(down.screen_position(), Some(Offset::new(4, 7)));
        assert!(down.is_pointer());

        let key = InputEvent::key("ctrl+c").unwrap();
        assert_eq!(key.screen_position(), None);
        assert!(key.modifiers().control());
        assert_eq!(key.as_key().map(KeyEvent::name).as_deref(), Some("ctrl+c"));
    }

    #[test]
    fn test_event_json() {
        let event: InputEvent =
            serde_json::from_str(r#"{"type":"mouse_down","position":{"x":3,"y":2}}"#).unwrap();
        assert_eq!(event, InputEvent::mouse_down(3, 2));

        let event: InputEvent = serde_json::from_str(r#"{"type":"key","key":"ctrl+z"}"#).unwrap();
        assert_eq!(event, InputEvent::key("ctrl+z").unwrap());

        let json = serde_json::to_string(&InputEvent::key("tab").unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"key","key":"tab"}"#);
    }
}
