//! One-way upgrade from the local backend to a host-injected remote one.

use crate::prefs::PreferenceStore;
use crate::storage::{BackendKind, PrefKey, RemoteBackend, RemoteSlot, StorageBackend};
use crate::timer::{RetryPoll, RetryTask};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionOutcome {
    /// Nothing to do this turn; keep polling.
    Pending,
    /// Swapped to the remote backend. `migrated` means the remote side was
    /// empty and got seeded from local state; otherwise `changed` says whether
    /// loading from it altered the in-memory preferences.
    Adopted { migrated: bool, changed: bool },
    AlreadyAdopted,
    /// Attempt budget spent; the local backend stays for good.
    GaveUp,
}

/// Polls the [`RemoteSlot`] on a bounded schedule and adopts the first
/// adapter it finds.
pub struct BackendAdoptionController {
    slot: RemoteSlot,
    task: RetryTask,
    adopted: bool,
    gave_up_logged: bool,
}

impl BackendAdoptionController {
    pub fn new(slot: RemoteSlot, interval: Duration, max_attempts: u32, start: Instant) -> Self {
        Self {
            slot,
            task: RetryTask::new(interval, max_attempts, start),
            adopted: false,
            gave_up_logged: false,
        }
    }

    pub fn is_adopted(&self) -> bool {
        self.adopted
    }

    pub fn attempts(&self) -> u32 {
        self.task.attempts()
    }

    pub fn poll(&mut self, store: &mut PreferenceStore, now: Instant) -> AdoptionOutcome {
        match self.task.poll(now) {
            RetryPoll::Idle => AdoptionOutcome::Pending,
            RetryPoll::Finished if self.adopted => AdoptionOutcome::AlreadyAdopted,
            RetryPoll::Finished => {
                if !self.gave_up_logged {
                    self.gave_up_logged = true;
                    tracing::info!(
                        attempts = self.task.attempts(),
                        "remote storage never appeared; staying on local backend"
                    );
                }
                AdoptionOutcome::GaveUp
            }
            RetryPoll::Attempt(_) => self.try_adopt(store),
        }
    }

    /// Adopt the injected adapter now, if there is one.
    pub fn try_adopt(&mut self, store: &mut PreferenceStore) -> AdoptionOutcome {
        if self.adopted || store.backend().kind() == BackendKind::Remote {
            self.adopted = true;
            self.task.cancel_token().cancel();
            return AdoptionOutcome::AlreadyAdopted;
        }
        let Some(adapter) = self.slot.current() else {
            return AdoptionOutcome::Pending;
        };

        let previous = store.state().clone();
        let remote = RemoteBackend::new(adapter);
        let has_remote_data = has_prior_data(&remote);

        store.backend_mut().upgrade(remote);
        self.adopted = true;
        self.task.cancel_token().cancel();
        store.install_listeners();

        if has_remote_data {
            let changed = store.load();
            tracing::info!(changed, "adopted remote storage with existing preferences");
            AdoptionOutcome::Adopted {
                migrated: false,
                changed,
            }
        } else {
            store.restore(previous);
            store.save();
            tracing::info!("adopted empty remote storage; migrated local preferences");
            AdoptionOutcome::Adopted {
                migrated: true,
                changed: false,
            }
        }
    }
}

fn has_prior_data(remote: &RemoteBackend) -> bool {
    let read = |key: PrefKey| remote.get(key).ok().flatten();
    let non_empty = |v: Option<String>| v.map_or(false, |s| !s.is_empty());
    non_empty(read(PrefKey::CaretColor))
        || non_empty(read(PrefKey::PointerColor))
        || read(PrefKey::PointerSize).is_some()
}
