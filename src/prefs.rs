//! Validated preference model and its persistence/fan-out path.

use crate::change_bus::{BroadcastMessage, ChangeBus};
use crate::color::HexColor;
use crate::storage::{ActiveBackend, PrefKey, StorageBackend, ValueChange};
use std::sync::mpsc::{channel, Receiver, Sender};

pub const POINTER_MIN: u32 = 10;
pub const POINTER_MAX: u32 = 48;
pub const POINTER_STEP: u32 = 2;
pub const POINTER_DEFAULT: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceState {
    pub caret_color: HexColor,
    pub pointer_color: HexColor,
    pub pointer_size: u32,
    pub pointer_enabled: bool,
    /// Canonical persisted caret flag. Contexts keep their own runtime flags.
    pub caret_enabled: bool,
    /// Process-local; never persisted or broadcast.
    pub debug_enabled: bool,
}

impl Default for PreferenceState {
    fn default() -> Self {
        Self {
            caret_color: HexColor::default(),
            pointer_color: HexColor::default(),
            pointer_size: POINTER_DEFAULT,
            pointer_enabled: true,
            caret_enabled: true,
            debug_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefField {
    CaretColor,
    PointerColor,
    PointerSize,
    PointerEnabled,
    CaretEnabled,
    DebugEnabled,
}

impl PrefField {
    fn from_key(key: PrefKey) -> Self {
        match key {
            PrefKey::CaretColor => PrefField::CaretColor,
            PrefKey::PointerColor => PrefField::PointerColor,
            PrefKey::PointerSize => PrefField::PointerSize,
            PrefKey::PointerEnabled => PrefField::PointerEnabled,
            PrefKey::CaretEnabled => PrefField::CaretEnabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::Text(value.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        PrefValue::Text(value)
    }
}

impl From<i64> for PrefValue {
    fn from(value: i64) -> Self {
        PrefValue::Int(value)
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Bool(value)
    }
}

pub fn clamp_pointer_size(n: i64) -> u32 {
    n.clamp(POINTER_MIN as i64, POINTER_MAX as i64) as u32
}

/// Leading integer of `s`, ignoring surrounding whitespace and any trailing
/// garbage (`"14px"` -> 14). `None` when no digits lead. Values beyond `i64`
/// saturate so they still clamp.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits
    };
    Some(signed.parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

fn parse_flag(raw: &str) -> bool {
    raw == "true"
}

pub type PrefObserver = Box<dyn FnMut(PrefField, &PreferenceState)>;

/// Owns the preference state, the active storage backend and the change bus.
///
/// Setters never persist; `save` is the only path that writes the backend and
/// broadcasts to other instances.
pub struct PreferenceStore {
    state: PreferenceState,
    backend: ActiveBackend,
    bus: ChangeBus,
    observers: Vec<PrefObserver>,
    changes_tx: Sender<ValueChange>,
    changes_rx: Receiver<ValueChange>,
    listeners_for: Option<u32>,
}

impl PreferenceStore {
    pub fn new(backend: ActiveBackend, bus: ChangeBus) -> Self {
        let (changes_tx, changes_rx) = channel();
        Self {
            state: PreferenceState::default(),
            backend,
            bus,
            observers: Vec::new(),
            changes_tx,
            changes_rx,
            listeners_for: None,
        }
    }

    pub fn state(&self) -> &PreferenceState {
        &self.state
    }

    pub fn backend(&self) -> &ActiveBackend {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut ActiveBackend {
        &mut self.backend
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn observe(&mut self, observer: PrefObserver) {
        self.observers.push(observer);
    }

    fn notify(&mut self, field: PrefField) {
        for observer in self.observers.iter_mut() {
            observer(field, &self.state);
        }
    }

    pub fn get(&self, field: PrefField) -> PrefValue {
        let s = &self.state;
        match field {
            PrefField::CaretColor => PrefValue::Text(s.caret_color.to_string()),
            PrefField::PointerColor => PrefValue::Text(s.pointer_color.to_string()),
            PrefField::PointerSize => PrefValue::Int(s.pointer_size as i64),
            PrefField::PointerEnabled => PrefValue::Bool(s.pointer_enabled),
            PrefField::CaretEnabled => PrefValue::Bool(s.caret_enabled),
            PrefField::DebugEnabled => PrefValue::Bool(s.debug_enabled),
        }
    }

    /// Validate and store `value`. Invalid input is dropped and the previous
    /// value kept. Returns whether the field changed.
    pub fn set(&mut self, field: PrefField, value: impl Into<PrefValue>) -> bool {
        let changed = match (field, value.into()) {
            (PrefField::CaretColor, PrefValue::Text(t)) => match HexColor::parse(&t) {
                Some(c) => replace(&mut self.state.caret_color, c),
                None => false,
            },
            (PrefField::PointerColor, PrefValue::Text(t)) => match HexColor::parse(&t) {
                Some(c) => replace(&mut self.state.pointer_color, c),
                None => false,
            },
            (PrefField::PointerSize, PrefValue::Int(n)) => {
                replace(&mut self.state.pointer_size, clamp_pointer_size(n))
            }
            (PrefField::PointerSize, PrefValue::Text(t)) => match parse_leading_int(&t) {
                Some(n) => replace(&mut self.state.pointer_size, clamp_pointer_size(n)),
                None => false,
            },
            (PrefField::PointerEnabled, PrefValue::Bool(b)) => {
                replace(&mut self.state.pointer_enabled, b)
            }
            (PrefField::CaretEnabled, PrefValue::Bool(b)) => {
                replace(&mut self.state.caret_enabled, b)
            }
            (PrefField::DebugEnabled, PrefValue::Bool(b)) => {
                replace(&mut self.state.debug_enabled, b)
            }
            (PrefField::PointerEnabled | PrefField::CaretEnabled, PrefValue::Text(t))
                if t == "true" || t == "false" =>
            {
                return self.set(field, parse_flag(&t));
            }
            _ => false,
        };
        if changed {
            self.notify(field);
        }
        changed
    }

    /// Move the pointer size by `steps` increments, clamped.
    pub fn step_pointer_size(&mut self, steps: i64) -> bool {
        let next = (self.state.pointer_size as i64)
            .saturating_add(steps.saturating_mul(POINTER_STEP as i64));
        self.set(PrefField::PointerSize, next)
    }

    /// Replace every persisted field with the defaults. The debug flag stays.
    pub fn reset_defaults(&mut self) -> bool {
        let debug = self.state.debug_enabled;
        self.restore(PreferenceState {
            debug_enabled: debug,
            ..PreferenceState::default()
        })
    }

    /// Overwrite the persisted fields from `previous`. Returns whether any changed.
    pub fn restore(&mut self, previous: PreferenceState) -> bool {
        let mut changed = false;
        changed |= self.set(PrefField::CaretColor, previous.caret_color.as_str());
        changed |= self.set(PrefField::PointerColor, previous.pointer_color.as_str());
        changed |= self.set(PrefField::PointerSize, previous.pointer_size as i64);
        changed |= self.set(PrefField::PointerEnabled, previous.pointer_enabled);
        changed |= self.set(PrefField::CaretEnabled, previous.caret_enabled);
        changed
    }

    /// Read every key from the active backend, keeping only values that pass
    /// validation. Returns whether anything changed.
    pub fn load(&mut self) -> bool {
        let mut changed = false;
        for key in PrefKey::ALL {
            let raw = match self.backend.backend().get(key) {
                Ok(Some(raw)) if !raw.is_empty() => raw,
                Ok(_) => continue,
                Err(err) => {
                    tracing::debug!(?err, key = key.storage_key(), "storage read failed");
                    continue;
                }
            };
            changed |= self.set(PrefField::from_key(key), raw);
        }
        changed
    }

    /// Persist every field, then broadcast the snapshot to other instances.
    pub fn save(&self) {
        let s = &self.state;
        let size = s.pointer_size.to_string();
        let values = [
            (PrefKey::CaretColor, s.caret_color.as_str()),
            (PrefKey::PointerColor, s.pointer_color.as_str()),
            (PrefKey::PointerSize, size.as_str()),
            (PrefKey::PointerEnabled, bool_str(s.pointer_enabled)),
            (PrefKey::CaretEnabled, bool_str(s.caret_enabled)),
        ];
        for (key, value) in values {
            if let Err(err) = self.backend.backend().set(key, value) {
                tracing::debug!(?err, key = key.storage_key(), "storage write failed");
            }
        }
        self.bus.publish(&self.snapshot());
    }

    pub fn snapshot(&self) -> BroadcastMessage {
        let s = &self.state;
        BroadcastMessage {
            caret_color: Some(s.caret_color.to_string()),
            pointer_color: Some(s.pointer_color.to_string()),
            pointer_size: Some(s.pointer_size as i64),
            pointer_enabled: Some(s.pointer_enabled),
            caret_enabled: Some(s.caret_enabled),
        }
    }

    /// Apply a peer's snapshot field by field. Returns the fields that changed.
    pub fn apply_message(&mut self, msg: &BroadcastMessage) -> Vec<PrefField> {
        let mut changed = Vec::new();
        if let Some(c) = &msg.caret_color {
            if self.set(PrefField::CaretColor, c.as_str()) {
                changed.push(PrefField::CaretColor);
            }
        }
        if let Some(c) = &msg.pointer_color {
            if self.set(PrefField::PointerColor, c.as_str()) {
                changed.push(PrefField::PointerColor);
            }
        }
        if let Some(n) = msg.pointer_size {
            if self.set(PrefField::PointerSize, n) {
                changed.push(PrefField::PointerSize);
            }
        }
        if let Some(b) = msg.pointer_enabled {
            if self.set(PrefField::PointerEnabled, b) {
                changed.push(PrefField::PointerEnabled);
            }
        }
        if let Some(b) = msg.caret_enabled {
            if self.set(PrefField::CaretEnabled, b) {
                changed.push(PrefField::CaretEnabled);
            }
        }
        changed
    }

    /// Apply one externally-originated storage change.
    pub fn apply_value_change(&mut self, change: &ValueChange) -> Option<PrefField> {
        let raw = change.new_value.as_deref().filter(|v| !v.is_empty())?;
        let field = PrefField::from_key(change.key);
        self.set(field, raw).then_some(field)
    }

    /// Register change watches on the active backend. A no-op when they are
    /// already installed for the current backend.
    pub fn install_listeners(&mut self) -> bool {
        let generation = self.backend.generation();
        if self.listeners_for == Some(generation) {
            return false;
        }
        for key in PrefKey::ALL {
            if let Err(err) = self.backend.backend().watch(key, self.changes_tx.clone()) {
                tracing::debug!(?err, key = key.storage_key(), "storage watch failed");
            }
        }
        self.listeners_for = Some(generation);
        true
    }

    /// External storage changes received since the last call.
    pub fn take_value_changes(&self) -> Vec<ValueChange> {
        self.changes_rx.try_iter().collect()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
