//! Per-user mutual exclusion.
//!
//! Refresh and reconciliation read a credential, call out to Discord, then
//! write the credential back. Two requests for the same user must not
//! interleave those steps, so every such sequence runs under a [`UserGuard`].
//! Operations that need the exclusion take `&UserGuard` rather than a bare
//! user id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use zeitfrei_types::UserId;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of per-user async locks.
///
/// Entries are created on demand and pruned when the last holder or waiter
/// lets go, so the map only holds users with in-flight work.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    slots: Arc<Mutex<HashMap<UserId, Slot>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn lock(&self, user_id: UserId) -> UserGuard {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(user_id).or_default())
        };

        let guard = slot.lock_owned().await;
        UserGuard {
            user_id,
            locks: self.clone(),
            guard: Some(guard),
        }
    }

    /// Number of users with a live lock entry.
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }

    fn release(&self, user_id: UserId, guard: OwnedMutexGuard<()>) {
        let mut slots = self.slots.lock();
        drop(guard);
        // Only the map still references the slot: nobody is holding or waiting.
        if slots
            .get(&user_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&user_id);
        }
    }
}

/// Proof of exclusive access to one user's credential.
#[derive(Debug)]
pub struct UserGuard {
    user_id: UserId,
    locks: UserLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserGuard {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.locks.release(self.user_id, guard);
        }
    }
}
