//! Analysis endpoints: trigger runs, ingest code indexes, fetch artifacts

use super::server::AppState;
use super::{ApiError, ApiResult};
use crate::error::AriadneError;
use crate::orchestrator::AnalysisInput;
use crate::types::{AnalysisKind, CodeFile};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

/// Trigger the primary architecture analysis for a repo.
///
/// Responds immediately; the run (and its cascade) completes in the
/// background.
pub async fn trigger_analysis(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let repo_id = format!("{}/{}", owner, repo);
    info!("analysis triggered for {}", repo_id);

    let orchestrator = state.orchestrator.clone();
    let background_repo_id = repo_id.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator
            .run_architecture_analysis(AnalysisInput::for_repo(background_repo_id.clone()))
            .await
        {
            error!("background analysis failed for {}: {}", background_repo_id, err);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "repoId": repo_id, "status": "analyzing" })),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub commit_sha: String,
    pub files: Vec<CodeFile>,
}

/// Ingest a code index snapshot (versioned copy + "latest" alias).
///
/// A new index makes any cached embedding set stale; dropping it is
/// best-effort.
pub async fn ingest_code_index(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let key = state
        .orchestrator
        .ingest_code_index(&repo_id, &request.commit_sha, &request.files)
        .await?;
    if let Err(err) = state.retrieval.invalidate(&repo_id).await {
        error!("could not invalidate embeddings for {}: {}", repo_id, err);
    }
    Ok(Json(json!({ "repoId": repo_id, "key": key })))
}

/// Current repo record, including analysis status
pub async fn repo_status(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let record = state
        .records
        .get_repo(&repo_id)
        .await?
        .ok_or(AriadneError::NotFound(repo_id))?;
    Ok(Json(serde_json::to_value(record).map_err(AriadneError::from)?))
}

async fn artifact(state: &AppState, owner: &str, repo: &str, kind: AnalysisKind) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let content = state
        .orchestrator
        .get_artifact(&repo_id, kind)
        .await?
        .ok_or_else(|| ApiError(AriadneError::NotFound(format!("{} for {}", kind, repo_id))))?;
    Ok(Json(content))
}

pub async fn get_architecture(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    artifact(&state, &owner, &repo, AnalysisKind::Architecture).await
}

pub async fn get_conventions(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    artifact(&state, &owner, &repo, AnalysisKind::Conventions).await
}

pub async fn get_walkthroughs(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    artifact(&state, &owner, &repo, AnalysisKind::Walkthrough).await
}

pub async fn get_env_setup(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    artifact(&state, &owner, &repo, AnalysisKind::EnvSetup).await
}
