use super::{ChangeSink, KvHandle, PrefKey, StorageBackend};
use std::cell::RefCell;
use std::rc::Rc;

/// Cross-instance storage capability injected by the host.
///
/// `watch` is optional; adapters without change notification keep the
/// default no-op and rely on the broadcast path for convergence.
pub trait RemoteAdapter {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>>;
    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()>;
    fn watch(&self, _key: PrefKey, _sink: ChangeSink) -> anyhow::Result<()> {
        Ok(())
    }
    fn unwatch_all(&self) {}
}

impl RemoteAdapter for KvHandle {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>> {
        Ok(KvHandle::get(self, key))
    }

    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()> {
        KvHandle::set(self, key, value)
    }

    fn watch(&self, key: PrefKey, sink: ChangeSink) -> anyhow::Result<()> {
        KvHandle::watch(self, key, sink);
        Ok(())
    }

    fn unwatch_all(&self) {
        KvHandle::unwatch_all(self);
    }
}

pub struct RemoteBackend {
    adapter: Rc<dyn RemoteAdapter>,
}

impl RemoteBackend {
    pub fn new(adapter: Rc<dyn RemoteAdapter>) -> Self {
        Self { adapter }
    }
}

impl StorageBackend for RemoteBackend {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>> {
        self.adapter.get(key)
    }

    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()> {
        self.adapter.set(key, value)
    }

    fn watch(&self, key: PrefKey, sink: ChangeSink) -> anyhow::Result<()> {
        self.adapter.watch(key, sink)
    }

    fn unwatch_all(&self) {
        self.adapter.unwatch_all();
    }
}

/// Injection point the host fills in when its remote capability is ready.
///
/// May be filled long after the engine has started.
#[derive(Clone, Default)]
pub struct RemoteSlot {
    adapter: Rc<RefCell<Option<Rc<dyn RemoteAdapter>>>>,
}

impl RemoteSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, adapter: Rc<dyn RemoteAdapter>) {
        *self.adapter.borrow_mut() = Some(adapter);
    }

    pub fn current(&self) -> Option<Rc<dyn RemoteAdapter>> {
        self.adapter.borrow().clone()
    }

    pub fn is_filled(&self) -> bool {
        self.adapter.borrow().is_some()
    }
}
