//! Ariadne - Codebase Onboarding Intelligence
//!
//! A Rust service that turns repository analysis artifacts and developer
//! interaction events into two derived products:
//! - A durable, cached analysis pipeline with explicit status tracking
//! - Per-developer and per-team understanding scores computed from raw
//!   interaction events
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Repo, ArchitectureMap, ProgressEvent, etc.)
//! - **Storage**: Capability traits for the blob, record, and event stores
//! - **Cache**: Namespaced cache-through layer with TTL
//! - **Provider**: AI analysis and embedding capability
//! - **Orchestrator**: Status state machine and cascading analysis stages
//! - **Progress**: Event scoring, timelines, and team aggregation
//! - **Retrieval**: Cosine-similarity search over embedded code chunks
//! - **Api**: axum HTTP surface
//!
//! # Example
//!
//! ```ignore
//! use ariadne_core::{AnalysisOrchestrator, AnalysisInput};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = AnalysisOrchestrator::new(provider, blobs, records);
//!     let record = orchestrator
//!         .run_architecture_analysis(AnalysisInput::for_repo("owner/repo"))
//!         .await?;
//!     println!("analyzed at {}", record.generated_at);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod retrieval;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use cache::{cache_key, CacheLayer, CacheNamespace};
pub use config::Settings;
pub use error::{AriadneError, Result};
pub use orchestrator::{AnalysisInput, AnalysisOrchestrator};
pub use progress::{
    classify_area, compute_developer_progress, compute_skill_scores, ProgressTracker,
};
pub use provider::{AiProvider, AnthropicProvider, ProviderConfig};
pub use retrieval::SemanticIndex;
pub use storage::{BlobStore, EventStore, RecordStore};
pub use types::{
    AnalysisKind, AnalysisStatus, ArchitectureMap, CodeFile, DeveloperProgress, ProgressEvent,
    ProgressEventKind, Repo, SkillArea, SkillScore, TeamProgress,
};
