//! Ariadne - Codebase Onboarding Intelligence
//!
//! Entry point for the HTTP service: wires the in-memory storage backends
//! and the Anthropic provider into the orchestrator, tracker, and retrieval
//! services, then serves the API.

use ariadne_core::api::{ApiServer, ApiServerConfig, AppState};
use ariadne_core::progress::ProgressTracker;
use ariadne_core::retrieval::SemanticIndex;
use ariadne_core::storage::memory::{MemoryBlobStore, MemoryEventStore, MemoryRecordStore};
use ariadne_core::{AnalysisOrchestrator, AnthropicProvider, CacheLayer, Settings};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ariadne", version, about = "Codebase onboarding intelligence service")]
struct Cli {
    /// Bind address for the API server
    #[arg(long, env = "ARIADNE_ADDR")]
    addr: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "ARIADNE_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::new(format!("ariadne={0},ariadne_core={0},tower_http=warn", cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("ariadne v{} starting...", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env();
    let addr = cli.addr.unwrap_or(settings.addr);

    let provider = Arc::new(AnthropicProvider::new(settings.provider.clone())?);
    let blobs = Arc::new(MemoryBlobStore::new());
    let records = Arc::new(MemoryRecordStore::new());
    let events = Arc::new(MemoryEventStore::new());

    let orchestrator =
        AnalysisOrchestrator::new(provider.clone(), blobs.clone(), records.clone());
    let tracker = ProgressTracker::new(events);
    let retrieval = SemanticIndex::new(provider, blobs.clone(), CacheLayer::new(records.clone()));

    let state = AppState {
        orchestrator,
        tracker,
        retrieval,
        blobs,
        records,
    };

    ApiServer::new(ApiServerConfig { addr }, state).serve().await?;
    Ok(())
}
