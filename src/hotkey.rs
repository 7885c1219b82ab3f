use crate::command::Command;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// An ASCII letter (stored upper-case) or digit.
    Char(char),
    Minus,
    Equal,
    NumpadSubtract,
    NumpadAdd,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Hotkey {
    /// Modifiers must match exactly; extra modifiers do not trigger the binding.
    pub fn matches(&self, press: &KeyPress) -> bool {
        self.key == press.key
            && self.ctrl == press.ctrl
            && self.shift == press.shift
            && self.alt == press.alt
    }
}

/// A key event as reported by the host's key-capture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl_alt(key: Key) -> Self {
        Self {
            key,
            ctrl: true,
            shift: false,
            alt: true,
        }
    }
}

/// Parse a hotkey string like "Ctrl+Alt+C" into a [`Hotkey`].
pub fn parse_hotkey(s: &str) -> Option<Hotkey> {
    let mut ctrl = false;
    let mut shift = false;
    let mut alt = false;
    let mut key: Option<Key> = None;

    for part in s.split('+') {
        let upper = part.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => ctrl = true,
            "SHIFT" => shift = true,
            "ALT" => alt = true,
            "" => {}
            _ => match parse_key(&upper) {
                Some(k) => key = Some(k),
                None => return None,
            },
        }
    }

    key.map(|k| Hotkey {
        key: k,
        ctrl,
        shift,
        alt,
    })
}

fn parse_key(upper: &str) -> Option<Key> {
    match upper {
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "-" | "MINUS" => Some(Key::Minus),
        "=" | "EQUAL" => Some(Key::Equal),
        "NUMPADSUBTRACT" | "NUM-" => Some(Key::NumpadSubtract),
        "NUMPADADD" | "NUM+" => Some(Key::NumpadAdd),
        _ if upper.len() == 1 => {
            let c = upper.chars().next()?;
            if c.is_ascii_alphanumeric() {
                Some(Key::Char(c))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// One configured binding as stored in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyEntry {
    pub command: Command,
    pub keys: String,
}

pub fn default_hotkey_entries() -> Vec<HotkeyEntry> {
    [
        (Command::TogglePanel, "Ctrl+Alt+O"),
        (Command::ToggleCaret, "Ctrl+Alt+C"),
        (Command::TogglePointer, "Ctrl+Alt+P"),
        (Command::Save, "Ctrl+Alt+S"),
        (Command::ToggleDebug, "Ctrl+Alt+D"),
        (Command::DecreasePointerSize, "Ctrl+Alt+Minus"),
        (Command::DecreasePointerSize, "Ctrl+Alt+NumpadSubtract"),
        (Command::IncreasePointerSize, "Ctrl+Alt+Equal"),
        (Command::IncreasePointerSize, "Ctrl+Alt+NumpadAdd"),
        (Command::ResetDefaults, "Ctrl+Alt+9"),
    ]
    .into_iter()
    .map(|(command, keys)| HotkeyEntry {
        command,
        keys: keys.into(),
    })
    .collect()
}

/// Resolved key-to-command table, gated behind a master enable flag.
#[derive(Debug, Clone)]
pub struct HotkeyBindings {
    enabled: bool,
    bindings: Vec<(Hotkey, Command)>,
}

impl HotkeyBindings {
    pub fn new(enabled: bool, entries: &[HotkeyEntry]) -> Self {
        let bindings = entries
            .iter()
            .filter_map(|entry| match parse_hotkey(&entry.keys) {
                Some(hk) => Some((hk, entry.command)),
                None => {
                    tracing::warn!(
                        "provided hotkey string '{}' for {:?} is invalid; ignoring",
                        entry.keys,
                        entry.command
                    );
                    None
                }
            })
            .collect();
        Self { enabled, bindings }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn resolve(&self, press: &KeyPress) -> Option<Command> {
        if !self.enabled {
            return None;
        }
        self.bindings
            .iter()
            .find(|(hk, _)| hk.matches(press))
            .map(|(_, cmd)| *cmd)
    }
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self::new(true, &default_hotkey_entries())
    }
}
