//! Analysis orchestrator
//!
//! Drives the repo status state machine and the full analysis pipeline:
//! resolve the file set, run the provider's architecture analysis, persist
//! the artifact into both storage tiers, then cascade into the secondary
//! stages (conventions, walkthroughs, environment setup) as independent
//! fire-and-forget tasks.

use crate::error::{AriadneError, Result};
use crate::provider::AiProvider;
use crate::storage::{
    analysis_output_key, code_index_key, latest_code_index_key, AnalysisRecord, BlobStore,
    RecordStore, RepoMetadataPatch,
};
use crate::types::{
    now_iso, AnalysisKind, AnalysisStatus, ArchitectureMap, CodeFile, Convention, EnvSetupGuide,
    Walkthrough,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Sentinel owner used when the repo record is missing
const SYSTEM_USER: &str = "system";

/// Input to an analysis run. Files may be supplied directly (ingestion
/// path) or resolved from the latest stored code index.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub repo_id: String,
    pub files: Option<Vec<CodeFile>>,
}

impl AnalysisInput {
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            files: None,
        }
    }
}

/// Orchestrates analysis runs over injected capability interfaces
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    provider: Arc<dyn AiProvider>,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            provider,
            blobs,
            records,
        }
    }

    /// Run the primary architecture analysis for a repo.
    ///
    /// Status transitions: `analyzing` on entry, `completed` on success,
    /// `failed` on any error (the status write during failure handling is
    /// itself best-effort). On success the three secondary stages are
    /// spawned without blocking the caller.
    pub async fn run_architecture_analysis(
        &self,
        input: AnalysisInput,
    ) -> Result<AnalysisRecord> {
        let repo_id = input.repo_id.clone();

        // Owning user for status writes; unknown repos still get updates
        let user_id = self
            .records
            .get_repo(&repo_id)
            .await
            .ok()
            .flatten()
            .map(|r| r.user_id)
            .unwrap_or_else(|| SYSTEM_USER.to_string());

        self.records
            .upsert_repo_status(
                &repo_id,
                &user_id,
                AnalysisStatus::Analyzing,
                RepoMetadataPatch::default(),
            )
            .await?;

        match self.analyze_and_persist(&input, &user_id).await {
            Ok((record, files)) => {
                self.spawn_cascade(&repo_id, files);
                Ok(record)
            }
            Err(err) => {
                error!("analysis failed for {}: {}", repo_id, err);
                // Best-effort: a failure updating status must not mask the
                // original error
                if let Err(status_err) = self
                    .records
                    .upsert_repo_status(
                        &repo_id,
                        &user_id,
                        AnalysisStatus::Failed,
                        RepoMetadataPatch::default(),
                    )
                    .await
                {
                    warn!("could not mark {} as failed: {}", repo_id, status_err);
                }
                Err(err)
            }
        }
    }

    /// The fallible middle of the primary run: resolve files, analyze,
    /// persist twice, mark completed. Any error here fails the run.
    async fn analyze_and_persist(
        &self,
        input: &AnalysisInput,
        user_id: &str,
    ) -> Result<(AnalysisRecord, Vec<CodeFile>)> {
        let repo_id = &input.repo_id;
        let files = self.resolve_files(repo_id, input.files.clone()).await?;

        info!(
            "starting architecture analysis for {} ({} files)",
            repo_id,
            files.len()
        );

        let architecture = self.provider.analyze_architecture(&files).await?;

        info!(
            "architecture analysis complete for {}: {} nodes, {} edges",
            repo_id,
            architecture.nodes.len(),
            architecture.edges.len()
        );

        let record = self
            .persist_artifact(
                repo_id,
                AnalysisKind::Architecture,
                serde_json::to_value(&architecture)?,
            )
            .await?;

        self.records
            .upsert_repo_status(
                repo_id,
                user_id,
                AnalysisStatus::Completed,
                RepoMetadataPatch {
                    tech_stack: Some(architecture.tech_stack),
                    file_count: Some(files.len()),
                },
            )
            .await?;

        Ok((record, files))
    }

    /// Resolve the file set: caller-supplied, or the latest ingested code
    /// index. Fails fast when neither is available.
    async fn resolve_files(
        &self,
        repo_id: &str,
        supplied: Option<Vec<CodeFile>>,
    ) -> Result<Vec<CodeFile>> {
        if let Some(files) = supplied {
            return Ok(files);
        }
        let stored = self
            .blobs
            .get_json(&latest_code_index_key(repo_id))
            .await?
            .ok_or_else(|| AriadneError::NoCodeIndex(repo_id.to_string()))?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Persist an artifact into both tiers: a new immutable version in the
    /// record store, and the overwritten current copy in the blob store.
    async fn persist_artifact(
        &self,
        repo_id: &str,
        kind: AnalysisKind,
        content: Value,
    ) -> Result<AnalysisRecord> {
        let generated_at = now_iso();
        let record = AnalysisRecord {
            repo_id: repo_id.to_string(),
            sort_key: AnalysisRecord::sort_key_for(kind.as_str(), &generated_at),
            version: 1,
            content: content.clone(),
            generated_at,
            model_used: self.provider.model_id().to_string(),
        };

        self.records.put_analysis(&record).await?;
        self.blobs
            .put_json(&analysis_output_key(repo_id, kind.as_str()), &content)
            .await?;
        Ok(record)
    }

    /// Launch the secondary stages without blocking the caller.
    ///
    /// Stages are independent best-effort tasks: they may run concurrently
    /// in any order, and one failing never cancels or blocks the others.
    fn spawn_cascade(&self, repo_id: &str, files: Vec<CodeFile>) {
        let conventions = {
            let this = self.clone();
            let input = AnalysisInput {
                repo_id: repo_id.to_string(),
                files: Some(files.clone()),
            };
            async move { this.run_convention_analysis(input).await.map(|_| ()) }
        };
        let walkthroughs = {
            let this = self.clone();
            let input = AnalysisInput {
                repo_id: repo_id.to_string(),
                files: Some(files.clone()),
            };
            async move { this.run_walkthrough_generation(input).await.map(|_| ()) }
        };
        let env_setup = {
            let this = self.clone();
            let input = AnalysisInput {
                repo_id: repo_id.to_string(),
                files: Some(files),
            };
            async move { this.run_env_setup_analysis(input).await.map(|_| ()) }
        };

        spawn_stage("conventions", repo_id, conventions);
        spawn_stage("walkthroughs", repo_id, walkthroughs);
        spawn_stage("env-setup", repo_id, env_setup);
    }

    /// Detect coding conventions and persist them
    pub async fn run_convention_analysis(&self, input: AnalysisInput) -> Result<Vec<Convention>> {
        let repo_id = input.repo_id.clone();
        let files = self.resolve_files(&repo_id, input.files).await?;

        info!("starting convention detection for {}", repo_id);
        let architecture = self.get_architecture(&repo_id).await?;
        let conventions = self
            .provider
            .detect_conventions(&files, architecture.as_ref())
            .await?;

        self.persist_artifact(
            &repo_id,
            AnalysisKind::Conventions,
            serde_json::to_value(&conventions)?,
        )
        .await?;

        info!("detected {} conventions for {}", conventions.len(), repo_id);
        Ok(conventions)
    }

    /// Generate pre-built walkthroughs and persist them
    pub async fn run_walkthrough_generation(
        &self,
        input: AnalysisInput,
    ) -> Result<Vec<Walkthrough>> {
        let repo_id = input.repo_id.clone();
        let files = self.resolve_files(&repo_id, input.files).await?;

        info!("generating walkthroughs for {}", repo_id);
        let architecture = self.get_architecture(&repo_id).await?;
        let mut walkthroughs = self
            .provider
            .generate_walkthroughs(&files, architecture.as_ref())
            .await?;
        for w in &mut walkthroughs {
            w.repo_id = repo_id.clone();
        }

        self.persist_artifact(
            &repo_id,
            AnalysisKind::Walkthrough,
            serde_json::to_value(&walkthroughs)?,
        )
        .await?;

        info!(
            "generated {} walkthroughs for {}",
            walkthroughs.len(),
            repo_id
        );
        Ok(walkthroughs)
    }

    /// Generate the environment setup guide and persist it
    pub async fn run_env_setup_analysis(&self, input: AnalysisInput) -> Result<EnvSetupGuide> {
        let repo_id = input.repo_id.clone();
        let files = self.resolve_files(&repo_id, input.files).await?;

        info!("analyzing environment setup for {}", repo_id);
        let guide = self.provider.analyze_env_setup(&files).await?;

        self.persist_artifact(
            &repo_id,
            AnalysisKind::EnvSetup,
            serde_json::to_value(&guide)?,
        )
        .await?;

        info!(
            "environment setup complete for {}: {} steps",
            repo_id,
            guide.setup_steps.len()
        );
        Ok(guide)
    }

    /// Current artifact payload for a repo and kind.
    ///
    /// Blob store first (cheap, fast); on miss or error, the most recent
    /// version in the record store. `None` when neither tier has data.
    pub async fn get_artifact(&self, repo_id: &str, kind: AnalysisKind) -> Result<Option<Value>> {
        match self
            .blobs
            .get_json(&analysis_output_key(repo_id, kind.as_str()))
            .await
        {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    "blob read failed for {}/{}, falling back to record store: {}",
                    repo_id, kind, err
                );
            }
        }

        let record = self.records.latest_analysis(repo_id, kind.as_str()).await?;
        Ok(record.map(|r| r.content))
    }

    /// Latest architecture map, or `None` when the repo has never been
    /// analyzed. Malformed stored payloads degrade rather than error.
    pub async fn get_architecture(&self, repo_id: &str) -> Result<Option<ArchitectureMap>> {
        let Some(value) = self.get_artifact(repo_id, AnalysisKind::Architecture).await? else {
            return Ok(None);
        };
        let map = match serde_json::from_value::<ArchitectureMap>(value) {
            Ok(map) => map,
            Err(err) => {
                warn!(
                    "stored architecture for {} is malformed, degrading: {}",
                    repo_id, err
                );
                ArchitectureMap::degraded()
            }
        };
        let dangling = map.dangling_edge_count();
        if dangling > 0 {
            warn!(
                "architecture for {} has {} edges referencing unknown nodes",
                repo_id, dangling
            );
        }
        Ok(Some(map))
    }

    /// Ingest a code index: versioned snapshot plus the "latest" alias read
    /// by file resolution.
    pub async fn ingest_code_index(
        &self,
        repo_id: &str,
        commit_sha: &str,
        files: &[CodeFile],
    ) -> Result<String> {
        let body = serde_json::to_value(files)?;
        let versioned = code_index_key(repo_id, commit_sha);
        self.blobs.put_json(&versioned, &body).await?;
        self.blobs
            .put_json(&latest_code_index_key(repo_id), &body)
            .await?;
        info!(
            "ingested code index for {} @ {} ({} files)",
            repo_id,
            commit_sha,
            files.len()
        );
        Ok(versioned)
    }
}

/// Spawn one cascade stage; failures are logged and fully swallowed
fn spawn_stage<F>(stage: &'static str, repo_id: &str, fut: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let repo_id = repo_id.to_string();
    tokio::spawn(async move {
        if let Err(err) = fut.await {
            error!("cascade stage {} failed for {}: {}", stage, repo_id, err);
        }
    });
}
