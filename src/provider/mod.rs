//! AI provider capability
//!
//! The orchestrator and retrieval layers consume analysis and embedding
//! generation through this trait; the production implementation talks to the
//! Anthropic messages API and a Voyage-style embeddings endpoint. Tests
//! substitute hand-rolled fakes.

pub mod anthropic;

pub use anthropic::{AnthropicProvider, ProviderConfig};

use crate::error::Result;
use crate::types::{ArchitectureMap, CodeFile, Convention, EnvSetupGuide, Walkthrough};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Capability interface for all AI-produced artifacts
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Produce the architecture map for a file set. May be multi-step
    /// internally; callers treat it as one opaque call.
    async fn analyze_architecture(&self, files: &[CodeFile]) -> Result<ArchitectureMap>;

    /// Detect coding conventions, optionally informed by the architecture
    async fn detect_conventions(
        &self,
        files: &[CodeFile],
        architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Convention>>;

    /// Generate pre-built walkthroughs for the most important flows
    async fn generate_walkthroughs(
        &self,
        files: &[CodeFile],
        architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Walkthrough>>;

    /// Generate an environment setup guide from config/readme files
    async fn analyze_env_setup(&self, files: &[CodeFile]) -> Result<EnvSetupGuide>;

    /// Embed a text into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier recorded on artifacts as the producer
    fn model_id(&self) -> &str;
}

/// Strip a leading/trailing markdown code fence from model output
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse model output into the expected shape, degrading to `fallback` on
/// malformed JSON so downstream consumers never see a parse failure.
pub(crate) fn parse_or_degraded<T: DeserializeOwned>(raw: &str, what: &str, fallback: T) -> T {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<T>(cleaned) {
        Ok(value) => value,
        Err(err) => {
            warn!("malformed {} payload from provider, using degraded default: {}", what, err);
            fallback
        }
    }
}
