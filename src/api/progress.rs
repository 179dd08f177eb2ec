//! Progress endpoints: record events, serve progress and team roll-ups

use super::server::AppState;
use super::ApiResult;
use crate::progress::tracker::DEFAULT_EVENT_LIMIT;
use crate::progress::RecordEventRequest;
use crate::storage::latest_code_index_key;
use crate::types::{ArchitectureMap, CodeFile};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Architecture for progress enrichment; any failure degrades to `None`
/// rather than failing the request
async fn architecture_or_none(state: &AppState, repo_id: &str) -> Option<ArchitectureMap> {
    match state.orchestrator.get_architecture(repo_id).await {
        Ok(map) => map,
        Err(err) => {
            warn!("architecture unavailable for {}: {}", repo_id, err);
            None
        }
    }
}

/// Record one progress event
pub async fn record_event(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Json(request): Json<RecordEventRequest>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let event = state.tracker.record_event(&repo_id, request).await?;
    Ok(Json(json!({ "success": true, "event": event })))
}

/// One user's full progress picture
pub async fn get_progress(
    State(state): State<AppState>,
    Path((owner, repo, user_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let architecture = architecture_or_none(&state, &repo_id).await;
    let progress = state
        .tracker
        .developer_progress(&repo_id, &user_id, architecture.as_ref())
        .await?;
    Ok(Json(serde_json::to_value(progress).map_err(crate::error::AriadneError::from)?))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// Raw events for one user
pub async fn get_events(
    State(state): State<AppState>,
    Path((owner, repo, user_id)): Path<(String, String, String)>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let events = state.tracker.events_for_user(&repo_id, &user_id, limit).await?;
    Ok(Json(json!({
        "repoId": repo_id,
        "userId": user_id,
        "count": events.len(),
        "events": events,
    })))
}

/// Team-wide progress roll-up
pub async fn get_team_progress(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let architecture = architecture_or_none(&state, &repo_id).await;
    let team = state.tracker.team_progress(&repo_id, architecture.as_ref()).await?;
    Ok(Json(serde_json::to_value(team).map_err(crate::error::AriadneError::from)?))
}

/// Ranked leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);
    let architecture = architecture_or_none(&state, &repo_id).await;
    let leaderboard = state
        .tracker
        .leaderboard(&repo_id, architecture.as_ref())
        .await?;
    Ok(Json(json!({ "repoId": repo_id, "leaderboard": leaderboard })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub k: Option<usize>,
}

/// Semantic code search over the repo's cached embeddings
pub async fn search_codebase(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let repo_id = format!("{}/{}", owner, repo);

    // Files are only needed when the embedding set has not been built yet
    let files: Vec<CodeFile> = match state.blobs.get_json(&latest_code_index_key(&repo_id)).await {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_default(),
        _ => Vec::new(),
    };

    let results = state
        .retrieval
        .search(&repo_id, &query.q, &files, query.k.unwrap_or(10))
        .await?;
    Ok(Json(json!({ "repoId": repo_id, "query": query.q, "results": results })))
}
