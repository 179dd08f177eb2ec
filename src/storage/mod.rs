//! Storage layer for the Ariadne onboarding system
//!
//! Two storage tiers back every analysis artifact: a low-latency blob store
//! holding a single current copy per (repo, kind), and a durable record
//! store holding timestamp-versioned immutable records. Progress events live
//! in their own append-only store with a fixed retention window.

pub mod memory;

use crate::error::Result;
use crate::types::{AnalysisStatus, ProgressEvent, Repo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Retention window for progress events, in seconds (90 days)
pub const EVENT_RETENTION_SECS: i64 = 90 * 86_400;

/// One versioned analysis record in the durable store
///
/// `sort_key` is `"{kind}#{generated_at}"`; records are immutable after
/// write. New runs create new versions, never updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub repo_id: String,
    pub sort_key: String,
    pub version: u32,
    pub content: Value,
    pub generated_at: String,
    pub model_used: String,
}

impl AnalysisRecord {
    /// Build the timestamp-suffixed sort key for a kind
    pub fn sort_key_for(kind: &str, generated_at: &str) -> String {
        format!("{}#{}", kind, generated_at)
    }
}

/// One cached payload in the durable store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub repo_id: String,
    pub key_hash: String,
    pub namespace: String,
    pub data: Value,
    /// Expiry as a unix epoch; entries past this are misses even if the
    /// physical delete has not happened yet
    pub expires_at: i64,
    pub created_at: String,
}

/// Optional repo metadata attached to a status transition
#[derive(Debug, Clone, Default)]
pub struct RepoMetadataPatch {
    pub tech_stack: Option<HashMap<String, String>>,
    pub file_count: Option<usize>,
}

/// Content-addressed-by-key JSON blob storage (fast read path)
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_json(&self, key: &str, value: &Value) -> Result<()>;

    /// Returns `None` on miss
    async fn get_json(&self, key: &str) -> Result<Option<Value>>;
}

/// Durable, range-queryable record storage
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write a new versioned analysis record (never overwrites)
    async fn put_analysis(&self, record: &AnalysisRecord) -> Result<()>;

    /// Most recent record whose sort key starts with `kind_prefix`
    async fn latest_analysis(
        &self,
        repo_id: &str,
        kind_prefix: &str,
    ) -> Result<Option<AnalysisRecord>>;

    async fn get_repo(&self, repo_id: &str) -> Result<Option<Repo>>;

    /// Update a repo's analysis status, creating the record if absent.
    /// A `completed` transition also stamps `last_analyzed_at`.
    async fn upsert_repo_status(
        &self,
        repo_id: &str,
        user_id: &str,
        status: AnalysisStatus,
        extra: RepoMetadataPatch,
    ) -> Result<()>;

    async fn put_cache_entry(&self, entry: &CacheEntry) -> Result<()>;

    async fn get_cache_entry(&self, repo_id: &str, key_hash: &str)
        -> Result<Option<CacheEntry>>;
}

/// Append-only progress event storage
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &ProgressEvent) -> Result<()>;

    /// Events for one user on one repo, in chronological order
    async fn events_for_user(
        &self,
        repo_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ProgressEvent>>;

    /// Distinct user ids with any recorded activity on a repo
    async fn user_ids_for_repo(&self, repo_id: &str) -> Result<Vec<String>>;
}

/// Blob key for the single current copy of an analysis artifact
pub fn analysis_output_key(repo_id: &str, kind: &str) -> String {
    format!("{}/analysis/{}.json", repo_id, kind)
}

/// Blob key for a versioned code index snapshot
pub fn code_index_key(repo_id: &str, commit_sha: &str) -> String {
    format!("{}/{}/index.json", repo_id, commit_sha)
}

/// Blob key for the "latest" code index alias
pub fn latest_code_index_key(repo_id: &str) -> String {
    code_index_key(repo_id, "latest")
}
