use caret_overlay::adoption::{AdoptionOutcome, BackendAdoptionController};
use caret_overlay::change_bus::{BroadcastFamily, ChangeBus};
use caret_overlay::prefs::{PrefField, PreferenceStore};
use caret_overlay::storage::{
    ActiveBackend, BackendKind, KvStore, LocalBackend, PrefKey, RemoteAdapter, RemoteSlot,
};
use std::rc::Rc;
use std::time::{Duration, Instant};

const STEP: Duration = Duration::from_millis(50);

fn local_store(kv: &KvStore) -> PreferenceStore {
    let mut store =
        PreferenceStore::new(ActiveBackend::new(LocalBackend::new(kv)), ChangeBus::unavailable());
    store.install_listeners();
    store
}

fn configure(store: &mut PreferenceStore) {
    store.set(PrefField::CaretColor, "#111111");
    store.set(PrefField::PointerColor, "#222222");
    store.set(PrefField::PointerSize, 20i64);
}

#[test]
fn empty_remote_is_seeded_from_local_state() {
    let local = KvStore::in_memory();
    let remote = KvStore::in_memory();
    let slot = RemoteSlot::new();
    let start = Instant::now();
    let mut store = local_store(&local);
    configure(&mut store);
    let mut ctl = BackendAdoptionController::new(slot.clone(), STEP, 200, start);

    assert_eq!(ctl.poll(&mut store, start + STEP), AdoptionOutcome::Pending);
    slot.inject(Rc::new(remote.connect()));
    let outcome = ctl.poll(&mut store, start + STEP * 2);

    assert_eq!(
        outcome,
        AdoptionOutcome::Adopted {
            migrated: true,
            changed: false
        }
    );
    assert_eq!(store.backend().kind(), BackendKind::Remote);
    assert_eq!(remote.raw_get("docsCaret.caretColor").as_deref(), Some("#111111"));
    assert_eq!(remote.raw_get("docsCaret.pointerColor").as_deref(), Some("#222222"));
    assert_eq!(remote.raw_get("docsCaret.pointerSize").as_deref(), Some("20"));
    assert_eq!(store.state().caret_color.as_str(), "#111111");
}

#[test]
fn populated_remote_overrides_local_state() {
    let local = KvStore::in_memory();
    let remote = KvStore::in_memory();
    let seed = remote.connect();
    seed.set(PrefKey::CaretColor, "#333333").unwrap();
    seed.set(PrefKey::PointerColor, "#444444").unwrap();
    seed.set(PrefKey::PointerSize, "30").unwrap();

    let slot = RemoteSlot::new();
    slot.inject(Rc::new(remote.connect()));
    let start = Instant::now();
    let mut store = local_store(&local);
    configure(&mut store);
    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);

    let outcome = ctl.poll(&mut store, start + STEP);

    assert_eq!(
        outcome,
        AdoptionOutcome::Adopted {
            migrated: false,
            changed: true
        }
    );
    let s = store.state();
    assert_eq!(s.caret_color.as_str(), "#333333");
    assert_eq!(s.pointer_color.as_str(), "#444444");
    assert_eq!(s.pointer_size, 30);
}

#[test]
fn adoption_happens_once() {
    let local = KvStore::in_memory();
    let slot = RemoteSlot::new();
    slot.inject(Rc::new(KvStore::in_memory().connect()));
    let start = Instant::now();
    let mut store = local_store(&local);
    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);

    assert!(matches!(
        ctl.poll(&mut store, start + STEP),
        AdoptionOutcome::Adopted { .. }
    ));
    assert_eq!(store.backend().generation(), 1);
    assert_eq!(ctl.try_adopt(&mut store), AdoptionOutcome::AlreadyAdopted);
    assert_eq!(
        ctl.poll(&mut store, start + STEP * 5),
        AdoptionOutcome::AlreadyAdopted
    );
    assert_eq!(store.backend().generation(), 1);
}

#[test]
fn gives_up_after_attempt_budget() {
    let local = KvStore::in_memory();
    let slot = RemoteSlot::new();
    let start = Instant::now();
    let mut store = local_store(&local);
    let mut ctl = BackendAdoptionController::new(slot.clone(), STEP, 3, start);

    for i in 1..=3u32 {
        assert_eq!(ctl.poll(&mut store, start + STEP * i), AdoptionOutcome::Pending);
    }
    assert_eq!(ctl.attempts(), 3);

    slot.inject(Rc::new(KvStore::in_memory().connect()));
    assert_eq!(ctl.poll(&mut store, start + STEP * 10), AdoptionOutcome::GaveUp);
    assert_eq!(store.backend().kind(), BackendKind::Local);
}

#[test]
fn polls_only_on_interval() {
    let local = KvStore::in_memory();
    let slot = RemoteSlot::new();
    slot.inject(Rc::new(KvStore::in_memory().connect()));
    let start = Instant::now();
    let mut store = local_store(&local);
    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);

    assert_eq!(
        ctl.poll(&mut store, start + Duration::from_millis(10)),
        AdoptionOutcome::Pending
    );
    assert_eq!(ctl.attempts(), 0);
}

#[test]
fn listeners_follow_the_swap_without_duplicates() {
    let local = KvStore::in_memory();
    let remote = KvStore::in_memory();
    let slot = RemoteSlot::new();
    slot.inject(Rc::new(remote.connect()));
    let start = Instant::now();
    let mut store = local_store(&local);
    assert!(!store.install_listeners(), "already installed for local");

    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);
    ctl.poll(&mut store, start + STEP);
    assert!(!store.install_listeners(), "adoption re-registered already");

    // writes from other instances, on both backends
    remote.connect().set(PrefKey::CaretColor, "#0000ff").unwrap();
    local.connect().set(PrefKey::CaretColor, "#00ff00").unwrap();

    let changes = store.take_value_changes();
    assert_eq!(changes.len(), 1, "only the active backend reports");
    assert_eq!(changes[0].new_value.as_deref(), Some("#0000ff"));
    assert_eq!(store.apply_value_change(&changes[0]), Some(PrefField::CaretColor));
}

#[test]
fn migration_broadcasts_to_peers() {
    let family = BroadcastFamily::new();
    let peer = ChangeBus::new(Box::new(family.join()));
    let local = KvStore::in_memory();
    let slot = RemoteSlot::new();
    slot.inject(Rc::new(KvStore::in_memory().connect()));
    let start = Instant::now();
    let mut store = PreferenceStore::new(
        ActiveBackend::new(LocalBackend::new(&local)),
        ChangeBus::new(Box::new(family.join())),
    );
    configure(&mut store);

    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);
    ctl.poll(&mut store, start + STEP);

    let got = peer.drain();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].caret_color.as_deref(), Some("#111111"));
}

struct ReadOnlyRemote;

impl RemoteAdapter for ReadOnlyRemote {
    fn get(&self, _key: PrefKey) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("unavailable"))
    }

    fn set(&self, _key: PrefKey, _value: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("unavailable"))
    }
}

#[test]
fn failing_remote_degrades_to_no_ops() {
    let local = KvStore::in_memory();
    let slot = RemoteSlot::new();
    slot.inject(Rc::new(ReadOnlyRemote));
    let start = Instant::now();
    let mut store = local_store(&local);
    configure(&mut store);
    let mut ctl = BackendAdoptionController::new(slot, STEP, 200, start);

    let outcome = ctl.poll(&mut store, start + STEP);
    assert_eq!(
        outcome,
        AdoptionOutcome::Adopted {
            migrated: true,
            changed: false
        }
    );
    assert_eq!(store.state().pointer_size, 20);
    assert!(!store.load());
}
