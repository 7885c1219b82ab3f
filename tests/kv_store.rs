use caret_overlay::storage::{KvStore, PrefKey};
use std::sync::mpsc::channel;
use tempfile::tempdir;

#[test]
fn writes_are_persisted_to_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    {
        let store = KvStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.connect().set(PrefKey::CaretColor, "#abcdef").unwrap();
    }
    let reopened = KvStore::open(&path).unwrap();
    assert_eq!(
        reopened.raw_get("docsCaret.caretColor").as_deref(),
        Some("#abcdef")
    );
    assert_eq!(reopened.snapshot().len(), 1);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(KvStore::open(&path).is_err());
}

#[test]
fn watchers_never_see_their_own_writes() {
    let store = KvStore::in_memory();
    let a = store.connect();
    let b = store.connect();
    let (tx_a, rx_a) = channel();
    let (tx_b, rx_b) = channel();
    a.watch(PrefKey::PointerSize, tx_a);
    b.watch(PrefKey::PointerSize, tx_b);

    a.set(PrefKey::PointerSize, "20").unwrap();
    a.set(PrefKey::PointerSize, "20").unwrap();

    assert!(rx_a.try_recv().is_err());
    let change = rx_b.try_recv().unwrap();
    assert_eq!(change.new_value.as_deref(), Some("20"));
    assert_eq!(change.old_value, None);
    assert!(rx_b.try_recv().is_err(), "unchanged value is not re-reported");
}

#[test]
fn watches_are_per_key_and_removable() {
    let store = KvStore::in_memory();
    let a = store.connect();
    let b = store.connect();
    let (tx, rx) = channel();
    b.watch(PrefKey::CaretColor, tx);

    a.set(PrefKey::PointerColor, "#000").unwrap();
    assert!(rx.try_recv().is_err());

    b.unwatch_all();
    a.set(PrefKey::CaretColor, "#000").unwrap();
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_receivers_are_pruned() {
    let store = KvStore::in_memory();
    let a = store.connect();
    let b = store.connect();
    {
        let (tx, _rx) = channel();
        b.watch(PrefKey::CaretColor, tx);
    }
    a.set(PrefKey::CaretColor, "#111").unwrap();
    a.set(PrefKey::CaretColor, "#222").unwrap();
    assert_ne!(a.origin(), b.origin());
}

#[test]
fn storage_keys_map_back() {
    for key in PrefKey::ALL {
        assert_eq!(PrefKey::from_storage_key(key.storage_key()), Some(key));
        assert!(key.storage_key().starts_with("docsCaret."));
    }
    assert_eq!(PrefKey::from_storage_key("docsCaret.nope"), None);
}
