//! In-memory storage backends
//!
//! Default backends for local runs and tests. Versioned analysis records
//! use a BTreeMap keyed by sort key so prefix range scans return versions in
//! order; everything else is hash maps behind an async RwLock.

use super::{
    AnalysisRecord, BlobStore, CacheEntry, EventStore, RecordStore, RepoMetadataPatch,
    EVENT_RETENTION_SECS,
};
use crate::error::Result;
use crate::types::{now_iso, AnalysisStatus, ProgressEvent, Repo};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory blob store
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_json(&self, key: &str, value: &Value) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        // Last writer wins; the current-copy key is intentionally overwritten
        blobs.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(key).cloned())
    }
}

/// In-memory record store
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    repos: Arc<RwLock<HashMap<String, Repo>>>,
    analyses: Arc<RwLock<HashMap<String, BTreeMap<String, AnalysisRecord>>>>,
    cache: Arc<RwLock<HashMap<(String, String), CacheEntry>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a repo record directly (ingestion glue / tests)
    pub async fn put_repo(&self, repo: Repo) {
        let mut repos = self.repos.write().await;
        repos.insert(repo.repo_id.clone(), repo);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        let mut analyses = self.analyses.write().await;
        analyses
            .entry(record.repo_id.clone())
            .or_default()
            .insert(record.sort_key.clone(), record.clone());
        Ok(())
    }

    async fn latest_analysis(
        &self,
        repo_id: &str,
        kind_prefix: &str,
    ) -> Result<Option<AnalysisRecord>> {
        let analyses = self.analyses.read().await;
        let Some(records) = analyses.get(repo_id) else {
            return Ok(None);
        };
        // Sort keys are "{kind}#{timestamp}"; the last key in the prefix
        // range is the most recent version.
        let latest = records
            .range(kind_prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(kind_prefix))
            .last()
            .map(|(_, v)| v.clone());
        Ok(latest)
    }

    async fn get_repo(&self, repo_id: &str) -> Result<Option<Repo>> {
        let repos = self.repos.read().await;
        Ok(repos.get(repo_id).cloned())
    }

    async fn upsert_repo_status(
        &self,
        repo_id: &str,
        user_id: &str,
        status: AnalysisStatus,
        extra: RepoMetadataPatch,
    ) -> Result<()> {
        let mut repos = self.repos.write().await;
        let repo = repos.entry(repo_id.to_string()).or_insert_with(|| Repo {
            repo_id: repo_id.to_string(),
            user_id: user_id.to_string(),
            default_branch: "main".to_string(),
            analysis_status: AnalysisStatus::Pending,
            last_analyzed_at: None,
            file_count: None,
            tech_stack: HashMap::new(),
        });

        repo.analysis_status = status;
        if status == AnalysisStatus::Completed {
            repo.last_analyzed_at = Some(now_iso());
        }
        if let Some(tech_stack) = extra.tech_stack {
            repo.tech_stack = tech_stack;
        }
        if let Some(file_count) = extra.file_count {
            repo.file_count = Some(file_count);
        }
        Ok(())
    }

    async fn put_cache_entry(&self, entry: &CacheEntry) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.insert(
            (entry.repo_id.clone(), entry.key_hash.clone()),
            entry.clone(),
        );
        Ok(())
    }

    async fn get_cache_entry(
        &self,
        repo_id: &str,
        key_hash: &str,
    ) -> Result<Option<CacheEntry>> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&(repo_id.to_string(), key_hash.to_string()))
            .cloned())
    }
}

struct StoredEvent {
    event: ProgressEvent,
    expires_at: i64,
}

/// In-memory progress event store
///
/// Events append in arrival order, which is chronological because the
/// tracker stamps timestamps at record time. Expired events are filtered on
/// read, matching the retention semantics of a TTL-backed table.
#[derive(Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<RwLock<HashMap<(String, String), Vec<StoredEvent>>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &ProgressEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events
            .entry((event.repo_id.clone(), event.user_id.clone()))
            .or_default()
            .push(StoredEvent {
                event: event.clone(),
                expires_at: Utc::now().timestamp() + EVENT_RETENTION_SECS,
            });
        Ok(())
    }

    async fn events_for_user(
        &self,
        repo_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ProgressEvent>> {
        let events = self.events.read().await;
        let now = Utc::now().timestamp();
        let result = events
            .get(&(repo_id.to_string(), user_id.to_string()))
            .map(|stored| {
                stored
                    .iter()
                    .filter(|s| s.expires_at > now)
                    .take(limit)
                    .map(|s| s.event.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(result)
    }

    async fn user_ids_for_repo(&self, repo_id: &str) -> Result<Vec<String>> {
        let events = self.events.read().await;
        let ids: BTreeSet<String> = events
            .keys()
            .filter(|(rid, _)| rid == repo_id)
            .map(|(_, uid)| uid.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgressEventKind;

    fn record(repo_id: &str, kind: &str, generated_at: &str) -> AnalysisRecord {
        AnalysisRecord {
            repo_id: repo_id.to_string(),
            sort_key: AnalysisRecord::sort_key_for(kind, generated_at),
            version: 1,
            content: serde_json::json!({"at": generated_at}),
            generated_at: generated_at.to_string(),
            model_used: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_latest_analysis_returns_most_recent_version() {
        let store = MemoryRecordStore::new();
        store
            .put_analysis(&record("o/r", "architecture", "2024-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        store
            .put_analysis(&record("o/r", "architecture", "2024-03-01T00:00:00.000Z"))
            .await
            .unwrap();
        store
            .put_analysis(&record("o/r", "architecture", "2024-02-01T00:00:00.000Z"))
            .await
            .unwrap();

        let latest = store
            .latest_analysis("o/r", "architecture")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.generated_at, "2024-03-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_latest_analysis_respects_kind_prefix() {
        let store = MemoryRecordStore::new();
        store
            .put_analysis(&record("o/r", "conventions", "2024-05-01T00:00:00.000Z"))
            .await
            .unwrap();
        store
            .put_analysis(&record("o/r", "architecture", "2024-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let latest = store
            .latest_analysis("o/r", "architecture")
            .await
            .unwrap()
            .unwrap();
        assert!(latest.sort_key.starts_with("architecture#"));

        assert!(store
            .latest_analysis("o/r", "walkthrough")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_repo_status_creates_and_transitions() {
        let store = MemoryRecordStore::new();
        store
            .upsert_repo_status(
                "o/r",
                "user-1",
                AnalysisStatus::Analyzing,
                RepoMetadataPatch::default(),
            )
            .await
            .unwrap();

        let repo = store.get_repo("o/r").await.unwrap().unwrap();
        assert_eq!(repo.analysis_status, AnalysisStatus::Analyzing);
        assert!(repo.last_analyzed_at.is_none());

        store
            .upsert_repo_status(
                "o/r",
                "user-1",
                AnalysisStatus::Completed,
                RepoMetadataPatch {
                    file_count: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let repo = store.get_repo("o/r").await.unwrap().unwrap();
        assert_eq!(repo.analysis_status, AnalysisStatus::Completed);
        assert!(repo.last_analyzed_at.is_some());
        assert_eq!(repo.file_count, Some(42));
    }

    #[tokio::test]
    async fn test_event_store_roundtrip_and_user_listing() {
        let store = MemoryEventStore::new();
        for (user, target) in [("alice", "m1"), ("alice", "m2"), ("bob", "m1")] {
            store
                .append(&ProgressEvent {
                    id: format!("{}-{}", user, target),
                    user_id: user.to_string(),
                    repo_id: "o/r".to_string(),
                    event_type: ProgressEventKind::ModuleExplored,
                    target_id: Some(target.to_string()),
                    target_label: None,
                    area: None,
                    timestamp: now_iso(),
                    duration_ms: None,
                })
                .await
                .unwrap();
        }

        let alice = store.events_for_user("o/r", "alice", 200).await.unwrap();
        assert_eq!(alice.len(), 2);

        let users = store.user_ids_for_repo("o/r").await.unwrap();
        assert_eq!(users, vec!["alice".to_string(), "bob".to_string()]);

        assert!(store
            .events_for_user("other/repo", "alice", 200)
            .await
            .unwrap()
            .is_empty());
    }
}
