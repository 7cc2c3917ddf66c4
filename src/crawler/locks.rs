//! Per-domain ingestion locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per domain, created on first use
///
/// Holding a domain's guard serializes graph commits for that domain; other
/// domains proceed independently. Entries nobody holds or waits on are
/// pruned on the next lookup, so deleted domains do not accumulate.
#[derive(Default)]
pub struct DomainLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, domain_id: i64) -> Arc<AsyncMutex<()>> {
        // The map is only touched by short insert/clone sections, so a
        // poisoned guard still holds a consistent map.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Guards and pending `lock_owned` calls each hold a clone.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(domain_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Waits for the domain's lock; the guard can be moved to another thread
    pub async fn acquire(&self, domain_id: i64) -> OwnedMutexGuard<()> {
        self.lock_for(domain_id).lock_owned().await
    }

    /// Number of domains with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the domain's lock if nobody holds it
    pub fn try_acquire(&self, domain_id: i64) -> Option<OwnedMutexGuard<()>> {
        self.lock_for(domain_id).try_lock_owned().ok()
    }
}
