//! Cache-through layer over the durable record store
//!
//! Provides namespaced, TTL-bounded caching for expensive computations.
//! Caching is an optimization, never a correctness requirement: write
//! failures are logged and swallowed, and expired entries are treated as
//! misses even before the storage layer physically deletes them.

use crate::error::Result;
use crate::storage::{CacheEntry, RecordStore};
use crate::types::now_iso;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default TTL for cached payloads (1 hour)
pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

/// Cache namespaces, one per cacheable computation class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    Qa,
    Translation,
    Animation,
    EmbeddingQuery,
    Fresher,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Qa => "qa",
            CacheNamespace::Translation => "translation",
            CacheNamespace::Animation => "animation",
            CacheNamespace::EmbeddingQuery => "embedding-query",
            CacheNamespace::Fresher => "fresher",
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic cache key: sha-256 over namespace, repo, and the
/// lower-cased, trimmed input, truncated to 24 hex chars.
pub fn cache_key(namespace: CacheNamespace, repo_id: &str, input: &str) -> String {
    let raw = format!(
        "{}:{}:{}",
        namespace.as_str(),
        repo_id,
        input.trim().to_lowercase()
    );
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)[..24].to_string()
}

/// Cache-through helper bound to a record store
#[derive(Clone)]
pub struct CacheLayer {
    records: Arc<dyn RecordStore>,
}

impl CacheLayer {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Get a cached value. Returns `None` when absent, expired, or when the
    /// read itself fails (a broken cache is a miss, not an error).
    pub async fn get(
        &self,
        namespace: CacheNamespace,
        repo_id: &str,
        input: &str,
    ) -> Option<Value> {
        let key = cache_key(namespace, repo_id, input);
        let entry = match self.records.get_cache_entry(repo_id, &key).await {
            Ok(entry) => entry?,
            Err(err) => {
                warn!("cache read failed for {}/{}: {}", namespace, key, err);
                return None;
            }
        };

        // Storage-layer TTL expiry is eventually consistent; re-check here
        if entry.expires_at < Utc::now().timestamp() {
            return None;
        }
        Some(entry.data)
    }

    /// Store a value with TTL. Best-effort: failures are logged and
    /// swallowed.
    pub async fn set(
        &self,
        namespace: CacheNamespace,
        repo_id: &str,
        input: &str,
        data: Value,
        ttl_seconds: i64,
    ) {
        let key = cache_key(namespace, repo_id, input);
        let entry = CacheEntry {
            repo_id: repo_id.to_string(),
            key_hash: key.clone(),
            namespace: namespace.as_str().to_string(),
            data,
            expires_at: Utc::now().timestamp() + ttl_seconds,
            created_at: now_iso(),
        };

        if let Err(err) = self.records.put_cache_entry(&entry).await {
            warn!("cache write failed for {}/{}: {}", namespace, key, err);
        }
    }

    /// Get from cache, or compute and cache.
    ///
    /// On a miss the computed result is returned immediately and persisted
    /// in a background task; a concurrent second caller may also miss and
    /// recompute. Duplicate work is tolerated rather than locked out.
    pub async fn through<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        repo_id: &str,
        input: &str,
        ttl_seconds: i64,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get(namespace, repo_id, input).await {
            match serde_json::from_value::<T>(cached) {
                Ok(value) => {
                    debug!("cache hit {}/{}", namespace, repo_id);
                    return Ok(value);
                }
                Err(err) => {
                    warn!("cached payload unreadable for {}/{}: {}", namespace, repo_id, err);
                }
            }
        }

        debug!("cache miss {}/{}", namespace, repo_id);
        let result = compute().await?;
        let payload = serde_json::to_value(&result)?;

        let layer = self.clone();
        let repo_id = repo_id.to_string();
        let input = input.to_string();
        tokio::spawn(async move {
            layer.set(namespace, &repo_id, &input, payload, ttl_seconds).await;
        });

        Ok(result)
    }
}
