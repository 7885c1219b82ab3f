use super::{ChangeSink, KvHandle, KvStore, PrefKey, StorageBackend};

/// Startup backend over a same-origin durable store. Always available.
#[derive(Clone)]
pub struct LocalBackend {
    handle: KvHandle,
}

impl LocalBackend {
    pub fn new(store: &KvStore) -> Self {
        Self {
            handle: store.connect(),
        }
    }

    pub fn handle(&self) -> &KvHandle {
        &self.handle
    }
}

impl StorageBackend for LocalBackend {
    fn get(&self, key: PrefKey) -> anyhow::Result<Option<String>> {
        Ok(self.handle.get(key))
    }

    fn set(&self, key: PrefKey, value: &str) -> anyhow::Result<()> {
        self.handle.set(key, value)
    }

    fn watch(&self, key: PrefKey, sink: ChangeSink) -> anyhow::Result<()> {
        self.handle.watch(key, sink);
        Ok(())
    }

    fn unwatch_all(&self) {
        self.handle.unwatch_all();
    }
}
