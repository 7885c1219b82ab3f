//! Pluggable key/value backends for persisted preferences.
//!
//! Exactly one backend is active at a time. The engine starts on the
//! [`LocalBackend`] and may upgrade once to a [`RemoteBackend`] when the host
//! injects one; the upgrade is never reversed.

mod kv;
mod local;
mod remote;

pub use kv::{KvHandle, KvStore};
pub use local::LocalBackend;
pub use remote::{RemoteAdapter, RemoteBackend, RemoteSlot};

use std::sync::mpsc::Sender;

/// Logical persisted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefKey {
    CaretColor,
    PointerColor,
    PointerSize,
    PointerEnabled,
    CaretEnabled,
}

impl PrefKey {
    pub const ALL: [PrefKey; 5] = [
        PrefKey::CaretColor,
        PrefKey::PointerColor,
        PrefKey::PointerSize,
        PrefKey::PointerEnabled,
        PrefKey::CaretEnabled,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            PrefKey::CaretColor => "docsCaret.caretColor",
            PrefKey::PointerColor => "docsCaret.pointerColor",
            PrefKey::PointerSize => "docsCaret.pointerSize",
            PrefKey::PointerEnabled => "docsCaret.pointerEnabled",
            PrefKey::CaretEnabled => "docsCaret.caretEnabled",
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.storage_key() == key)
    }
}

/// A value changed by some other instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    pub key: PrefKey,
    pub new_value: Option<String>,
    pub old_value: Option<String>,
}

pub type ChangeSink = Sender<ValueChange>;

/// get / set / change-notify contract shared by every backend.
///
/// Writes are fire-and-forget from the engine's point of view: callers log
/// and drop errors. `watch` only reports changes that did not originate from
/// the same handle.
pub trait StorageBackend {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>>;
    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()>;
    fn watch(&self, key: PrefKey, sink: ChangeSink) -> anyhow::Result<()>;
    /// Drop every watch registered through this handle.
    fn unwatch_all(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

pub enum Backend {
    Local(LocalBackend),
    Remote(RemoteBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    fn inner(&self) -> &dyn StorageBackend {
        match self {
            Backend::Local(b) => b,
            Backend::Remote(b) => b,
        }
    }
}

impl StorageBackend for Backend {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>> {
        self.inner().get(key)
    }

    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()> {
        self.inner().set(key, value)
    }

    fn watch(&self, key: PrefKey, sink: ChangeSink) -> anyhow::Result<()> {
        self.inner().watch(key, sink)
    }

    fn unwatch_all(&self) {
        self.inner().unwatch_all()
    }
}

/// The single owning reference to the backend in use.
///
/// `generation` increases on every swap so listener registration can tell
/// whether it already targets the current backend.
pub struct ActiveBackend {
    current: Backend,
    generation: u32,
}

impl ActiveBackend {
    pub fn new(local: LocalBackend) -> Self {
        Self {
            current: Backend::Local(local),
            generation: 0,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.current.kind()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn backend(&self) -> &Backend {
        &self.current
    }

    /// Swap to `remote`. Returns `false` if a remote backend is already active.
    pub fn upgrade(&mut self, remote: RemoteBackend) -> bool {
        if self.kind() == BackendKind::Remote {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, Backend::Remote(remote));
        previous.unwatch_all();
        self.generation += 1;
        true
    }
}
