//! HTTP API surface
//!
//! Thin axum handlers over the orchestrator, progress tracker, and
//! retrieval services. Route prefixes are a deployment detail; handlers
//! forward to the services and map errors to status codes.

pub mod analysis;
pub mod progress;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};

use crate::error::AriadneError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Handler-level error wrapper mapping the error taxonomy to HTTP statuses
pub struct ApiError(pub AriadneError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<AriadneError> for ApiError {
    fn from(err: AriadneError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            AriadneError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
