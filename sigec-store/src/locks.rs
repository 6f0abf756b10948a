//! Per-record-id async locks

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per record id, created on demand.
///
/// Entries nobody holds or waits on are dropped on the next acquire.
#[derive(Debug, Default)]
pub struct IdLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the whole locate-then-write sequence of one id.
#[derive(Debug)]
pub struct IdGuard {
    _guard: OwnedMutexGuard<()>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: &str) -> IdGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|key, slot| key == id || Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(id.to_string()).or_default())
        };
        IdGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Ids currently tracked.
    pub async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }
}
