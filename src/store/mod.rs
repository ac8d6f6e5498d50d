//! Persistent key-value seam plus the two stores built on it
//!
//! The backing store is abstract (`get`/`set`/`remove`, no cross-key
//! transactions). [`CooldownStore`] and [`ResultCache`] own disjoint key
//! namespaces and are the only writers to them.

pub mod cache;
pub mod clock;
pub mod cooldown;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

pub use cache::{CacheKey, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{CooldownCheck, CooldownScope, CooldownStore};

/// Asynchronous key-value store with per-key read/write/delete
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Persisted shape of a timestamp record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimestampRecord {
    pub at: i64,
}

/// Write `now` under `key`.
pub async fn write_timestamp(store: &dyn KvStore, key: &str, clock: &dyn Clock) -> Result<()> {
    let record = TimestampRecord { at: clock.now_ms() };
    store.set(key, serde_json::to_value(record)?).await
}

/// Read a timestamp record if it is still inside `window_ms`.
///
/// Expired or unreadable records are deleted and read as absent. The delete is
/// best effort; a failure there is logged and still reported as absent.
pub async fn read_if_fresh(
    store: &dyn KvStore,
    key: &str,
    window_ms: i64,
    clock: &dyn Clock,
) -> Result<Option<i64>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    let fresh = match serde_json::from_value::<TimestampRecord>(raw) {
        Ok(record) if clock.now_ms() <= record.at.saturating_add(window_ms) => Some(record.at),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("unreadable record at {}: {}", key, e);
            None
        }
    };
    if fresh.is_none()
        && let Err(e) = store.remove(key).await
    {
        tracing::warn!("failed to delete stale record {}: {}", key, e);
    }
    Ok(fresh)
}
