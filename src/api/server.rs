//! HTTP API server

use super::{analysis, progress};
use crate::orchestrator::AnalysisOrchestrator;
use crate::progress::ProgressTracker;
use crate::retrieval::SemanticIndex;
use crate::storage::{BlobStore, RecordStore};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

/// Shared handler state: the injected services
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
    pub tracker: ProgressTracker,
    pub retrieval: SemanticIndex,
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            // Analysis pipeline
            .route("/repos/:owner/:repo/analyze", post(analysis::trigger_analysis))
            .route("/repos/:owner/:repo/index", post(analysis::ingest_code_index))
            .route("/repos/:owner/:repo/status", get(analysis::repo_status))
            .route("/repos/:owner/:repo/architecture", get(analysis::get_architecture))
            .route("/repos/:owner/:repo/conventions", get(analysis::get_conventions))
            .route("/repos/:owner/:repo/walkthroughs", get(analysis::get_walkthroughs))
            .route("/repos/:owner/:repo/env-setup", get(analysis::get_env_setup))
            // Progress tracking
            .route("/progress/:owner/:repo/event", post(progress::record_event))
            .route("/progress/:owner/:repo/team", get(progress::get_team_progress))
            .route("/progress/:owner/:repo/leaderboard", get(progress::get_leaderboard))
            .route("/progress/:owner/:repo/:user_id", get(progress::get_progress))
            .route("/progress/:owner/:repo/:user_id/events", get(progress::get_events))
            // Semantic retrieval
            .route("/search/:owner/:repo", get(progress::search_codebase))
            // Health check
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until shutdown
    pub async fn serve(self) -> crate::error::Result<()> {
        let router = Self::build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("ariadne listening on http://{}", self.config.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
