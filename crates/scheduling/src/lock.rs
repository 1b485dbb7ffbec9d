use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes "check for conflicts, then write" per group.
///
/// Two bookings for the same group never interleave between their conflict
/// check and their write; bookings for different groups proceed in parallel.
/// The guard only covers this process.
#[derive(Debug, Default, Clone)]
pub struct GroupLocks {
  locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

#[derive(Debug)]
pub struct GroupGuard {
  group_id: Uuid,
  _guard: OwnedMutexGuard<()>,
}

impl GroupGuard {
  pub fn group_id(&self) -> Uuid {
    self.group_id
  }
}

impl GroupLocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn acquire(&self, group_id: Uuid) -> GroupGuard {
    let lock = {
      let mut locks = self.locks.lock();
      // Entries only referenced by the map are idle.
      locks.retain(|_, lock| Arc::strong_count(lock) > 1);
      locks.entry(group_id).or_default().clone()
    };

    GroupGuard {
      group_id,
      _guard: lock.lock_owned().await,
    }
  }

  /// Number of groups currently locked or waited on.
  pub fn active(&self) -> usize {
    self
      .locks
      .lock()
      .values()
      .filter(|lock| Arc::strong_count(lock) > 1)
      .count()
  }
}
