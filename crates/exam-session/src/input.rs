//! Keyboard bindings for the exam controls.
//!
//! The front end reports raw key-down / key-up events; [`KeyBindings`] maps
//! them onto [`Control`]s. Holding the dictation key captures speech and
//! releasing it stops the capture. The other controls fire on key-down only.

use std::fmt;
use std::str::FromStr;

use exam_core::config::KeysConfig;

use crate::error::SessionError;

/// A named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Control,
    Alt,
    Shift,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Space,
    Enter,
    Escape,
    Tab,
    /// A printable character, stored lowercase.
    Char(char),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Control => write!(f, "Control"),
            Key::Alt => write!(f, "Alt"),
            Key::Shift => write!(f, "Shift"),
            Key::ArrowLeft => write!(f, "ArrowLeft"),
            Key::ArrowRight => write!(f, "ArrowRight"),
            Key::ArrowUp => write!(f, "ArrowUp"),
            Key::ArrowDown => write!(f, "ArrowDown"),
            Key::Space => write!(f, "Space"),
            Key::Enter => write!(f, "Enter"),
            Key::Escape => write!(f, "Escape"),
            Key::Tab => write!(f, "Tab"),
            Key::Char(c) => write!(f, "{}", c),
        }
    }
}

impl FromStr for Key {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == " " {
            return Ok(Key::Space);
        }
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c.to_ascii_lowercase()));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "control" | "ctrl" => Ok(Key::Control),
            "alt" => Ok(Key::Alt),
            "shift" => Ok(Key::Shift),
            "arrowleft" | "left" => Ok(Key::ArrowLeft),
            "arrowright" | "right" => Ok(Key::ArrowRight),
            "arrowup" | "up" => Ok(Key::ArrowUp),
            "arrowdown" | "down" => Ok(Key::ArrowDown),
            "space" | "spacebar" => Ok(Key::Space),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "tab" => Ok(Key::Tab),
            _ => Err(SessionError::InvalidKey(format!("unknown key '{}'", s))),
        }
    }
}

/// A raw keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// What a bound key asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    StartDictation,
    StopDictation,
    Next,
    Previous,
    ReadAloud,
}

/// Result of feeding a key event to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not bound, or the session is not accepting exam keys right now.
    Ignored,
    /// Bound and acted on.
    Handled,
    /// Bound and acted on; the front end must suppress the key's default
    /// effect (e.g. Space scrolling or typing a blank).
    Consumed,
}

impl KeyOutcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

/// Key assignments for the exam controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub dictation: Key,
    pub next: Key,
    pub previous: Key,
    pub read_aloud: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            dictation: Key::Control,
            next: Key::ArrowRight,
            previous: Key::ArrowLeft,
            read_aloud: Key::Space,
        }
    }
}

impl KeyBindings {
    /// Parse the `[keys]` config section. Each control needs its own key.
    pub fn from_config(config: &KeysConfig) -> Result<Self, SessionError> {
        let bindings = Self {
            dictation: config.dictation.parse()?,
            next: config.next.parse()?,
            previous: config.previous.parse()?,
            read_aloud: config.read_aloud.parse()?,
        };

        let keys = [
            bindings.dictation,
            bindings.next,
            bindings.previous,
            bindings.read_aloud,
        ];
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(SessionError::InvalidKey(format!(
                    "'{}' is bound to more than one control",
                    key
                )));
            }
        }

        Ok(bindings)
    }

    /// Map a key event to the control it triggers, if any.
    pub fn resolve(&self, event: KeyEvent) -> Option<Control> {
        match event {
            KeyEvent::Down(key) if key == self.dictation => Some(Control::StartDictation),
            KeyEvent::Up(key) if key == self.dictation => Some(Control::StopDictation),
            KeyEvent::Down(key) if key == self.next => Some(Control::Next),
            KeyEvent::Down(key) if key == self.previous => Some(Control::Previous),
            KeyEvent::Down(key) if key == self.read_aloud => Some(Control::ReadAloud),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
