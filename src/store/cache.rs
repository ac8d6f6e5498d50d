//! Result cache for remote scan payloads
//!
//! All entries live in one consolidated blob under [`CACHE_STORAGE_KEY`].
//! Entries expire by TTL on read; on write the oldest-written entries are
//! evicted once the ceiling is exceeded.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::lane::Lane;
use crate::store::{Clock, KvStore};

pub const CACHE_STORAGE_KEY: &str = "chip_result_cache_v1";

static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Fold accents, lower-case and join `[a-z0-9]+` runs with underscores.
pub fn normalize_component(raw: &str) -> String {
    let folded: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    NON_ALNUM_RE
        .split(&folded)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalized `(lane, origin, subject, variant)` key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(lane: Lane, origin: &str, subject: &str, variant: Option<&str>) -> Self {
        let mut key = Self::scope_prefix(lane, origin, subject);
        if let Some(variant) = variant.map(normalize_component).filter(|v| !v.is_empty()) {
            key.push(':');
            key.push_str(&variant);
        }
        CacheKey(key)
    }

    fn scope_prefix(lane: Lane, origin: &str, subject: &str) -> String {
        format!(
            "{}:{}:{}",
            lane.as_str(),
            origin.trim().to_ascii_lowercase(),
            normalize_component(subject)
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub payload: Value,
    pub written_at: i64,
}

type Blob = HashMap<String, CacheEntry>;

pub struct ResultCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    max_entries: usize,
    // Serializes read-modify-write of the blob within this process.
    blob_lock: Mutex<()>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            store,
            clock,
            ttl_ms: config.ttl_ms(),
            max_entries: config.max_entries.max(1),
            blob_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Blob> {
        match self.store.get(CACHE_STORAGE_KEY).await? {
            Some(raw) => Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
                tracing::warn!("result cache blob unreadable, starting empty: {}", e);
                Blob::new()
            })),
            None => Ok(Blob::new()),
        }
    }

    async fn save(&self, blob: &Blob) -> Result<()> {
        self.store
            .set(CACHE_STORAGE_KEY, serde_json::to_value(blob)?)
            .await
    }

    /// Cached payload, or `None` when absent, expired or unreadable.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let _guard = self.blob_lock.lock().await;
        let mut blob = match self.load().await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("result cache read failed, treating as miss: {}", e);
                return None;
            }
        };
        let entry = blob.get(key.as_str())?;
        if self.clock.now_ms() <= entry.written_at.saturating_add(self.ttl_ms) {
            return Some(entry.payload.clone());
        }

        blob.remove(key.as_str());
        if let Err(e) = self.save(&blob).await {
            tracing::warn!("expired cache entry {} not removed: {}", key, e);
        }
        None
    }

    pub async fn set(&self, key: &CacheKey, payload: Value) {
        let _guard = self.blob_lock.lock().await;
        let mut blob = match self.load().await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("result cache write dropped for {}: {}", key, e);
                return;
            }
        };
        blob.insert(
            key.as_str().to_string(),
            CacheEntry {
                payload,
                written_at: self.clock.now_ms(),
            },
        );
        evict_oldest(&mut blob, self.max_entries);
        if let Err(e) = self.save(&blob).await {
            tracing::warn!("result cache write dropped for {}: {}", key, e);
        }
    }

    /// Drop the base entry and every variant entry for one subject scope.
    pub async fn invalidate_scope(&self, lane: Lane, origin: &str, subject: &str) -> usize {
        let _guard = self.blob_lock.lock().await;
        let prefix = CacheKey::scope_prefix(lane, origin, subject);
        let variant_prefix = format!("{prefix}:");
        let mut blob = match self.load().await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("cache invalidation skipped for {}: {}", prefix, e);
                return 0;
            }
        };
        let before = blob.len();
        blob.retain(|k, _| k != &prefix && !k.starts_with(&variant_prefix));
        let removed = before - blob.len();
        if removed > 0
            && let Err(e) = self.save(&blob).await
        {
            tracing::warn!("cache invalidation not persisted for {}: {}", prefix, e);
        }
        removed
    }
}

fn evict_oldest(blob: &mut Blob, max_entries: usize) {
    if blob.len() <= max_entries {
        return;
    }
    let mut by_age: Vec<(String, i64)> = blob
        .iter()
        .map(|(k, e)| (k.clone(), e.written_at))
        .collect();
    by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    let excess = blob.len() - max_entries;
    for (key, _) in by_age.into_iter().take(excess) {
        blob.remove(&key);
    }
}
