//! Per-entity write locks.
//!
//! Category documents are read-modify-written whole, so at most one task
//! may curate or deduplicate a given entity at a time. Different entities
//! never contend.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per entity id. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct EntityLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `entity_id`. Released when the guard drops.
    pub async fn lock(&self, entity_id: &str) -> Result<OwnedMutexGuard<()>> {
        let mutex = {
            let mut map = self
                .inner
                .lock()
                .map_err(|_| anyhow!("entity lock registry poisoned"))?;
            map.entry(entity_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        Ok(mutex.lock_owned().await)
    }
}
