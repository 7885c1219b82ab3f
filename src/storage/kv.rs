use super::{ChangeSink, PrefKey, ValueChange};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

struct Watcher {
    origin: u64,
    key: PrefKey,
    sink: ChangeSink,
}

struct KvInner {
    values: BTreeMap<String, String>,
    watchers: Vec<Watcher>,
    path: Option<PathBuf>,
    next_origin: Cell<u64>,
}

/// A string key/value store shared by every handle connected to it.
///
/// Each [`KvHandle`] is one writer; a write is reported to watchers of every
/// other handle, never to the writer itself. When opened from a path the map
/// is persisted as JSON after every write.
#[derive(Clone)]
pub struct KvStore {
    inner: Rc<RefCell<KvInner>>,
}

impl KvStore {
    pub fn in_memory() -> Self {
        Self::with_values(BTreeMap::new(), None)
    }

    /// Open a store persisted at `path`. A missing or empty file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let values = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content)?
        };
        Ok(Self::with_values(values, Some(path)))
    }

    fn with_values(values: BTreeMap<String, String>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(KvInner {
                values,
                watchers: Vec::new(),
                path,
                next_origin: Cell::new(1),
            })),
        }
    }

    /// Connect a new writer with its own origin.
    pub fn connect(&self) -> KvHandle {
        let inner = self.inner.borrow();
        let origin = inner.next_origin.get();
        inner.next_origin.set(origin + 1);
        KvHandle {
            store: self.clone(),
            origin,
        }
    }

    pub fn raw_get(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.borrow().values.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().values.is_empty()
    }

    fn write(&self, origin: u64, key: PrefKey, value: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.borrow_mut();
        let old_value = inner
            .values
            .insert(key.storage_key().to_string(), value.to_string());
        if old_value.as_deref() != Some(value) {
            let change = ValueChange {
                key,
                new_value: Some(value.to_string()),
                old_value,
            };
            // drop watchers whose receiving end went away
            inner.watchers.retain(|w| {
                if w.origin == origin || w.key != key {
                    return true;
                }
                w.sink.send(change.clone()).is_ok()
            });
        }
        if let Some(path) = &inner.path {
            let json = serde_json::to_string_pretty(&inner.values)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

/// One writer's view of a [`KvStore`].
#[derive(Clone)]
pub struct KvHandle {
    store: KvStore,
    origin: u64,
}

impl KvHandle {
    pub fn origin(&self) -> u64 {
        self.origin
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn get(&self, key: PrefKey) -> Option<String> {
        self.store.raw_get(key.storage_key())
    }

    pub fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()> {
        self.store.write(self.origin, key, value)
    }

    pub fn watch(&self, key: PrefKey, sink: ChangeSink) {
        self.store.inner.borrow_mut().watchers.push(Watcher {
            origin: self.origin,
            key,
            sink,
        });
    }

    pub fn unwatch_all(&self) {
        let origin = self.origin;
        self.store
            .inner
            .borrow_mut()
            .watchers
            .retain(|w| w.origin != origin);
    }
}
