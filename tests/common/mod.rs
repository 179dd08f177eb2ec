//! Common test fixtures: a scripted AI provider and fully wired services

use ariadne_core::api::AppState;
use ariadne_core::cache::CacheLayer;
use ariadne_core::error::{AriadneError, Result};
use ariadne_core::orchestrator::AnalysisOrchestrator;
use ariadne_core::progress::ProgressTracker;
use ariadne_core::provider::AiProvider;
use ariadne_core::retrieval::SemanticIndex;
use ariadne_core::storage::memory::{MemoryBlobStore, MemoryEventStore, MemoryRecordStore};
use ariadne_core::types::{
    AnalysisKind, ArchitectureMap, CodeFile, Convention, EnvSetupGuide, SetupStep, Walkthrough,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted provider: canned artifacts, switchable per-stage failures
#[derive(Default)]
pub struct FakeProvider {
    pub fail_architecture: AtomicBool,
    pub fail_conventions: AtomicBool,
    pub architecture_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl AiProvider for FakeProvider {
    async fn analyze_architecture(&self, _files: &[CodeFile]) -> Result<ArchitectureMap> {
        self.architecture_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_architecture.load(Ordering::SeqCst) {
            return Err(AriadneError::Provider(
                "scripted architecture failure".to_string(),
            ));
        }
        Ok(serde_json::from_value(serde_json::json!({
            "nodes": [
                {"id": "auth-svc", "label": "Auth Service", "type": "service",
                 "files": ["src/auth.rs"], "description": "Token issuing"},
                {"id": "api-router", "label": "API Router", "type": "module",
                 "files": ["src/api.rs"], "description": "Request routing"},
                {"id": "user-model", "label": "User Model", "type": "module",
                 "files": ["src/model.rs"], "description": "Persistence"}
            ],
            "edges": [
                {"source": "api-router", "target": "auth-svc", "label": "authenticates via"},
                {"source": "api-router", "target": "user-model", "label": "reads"}
            ],
            "techStack": {"language": "rust", "framework": "axum"},
            "summary": "A small web service."
        }))
        .expect("canned architecture is valid"))
    }

    async fn detect_conventions(
        &self,
        _files: &[CodeFile],
        _architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Convention>> {
        if self.fail_conventions.load(Ordering::SeqCst) {
            return Err(AriadneError::Provider(
                "scripted convention failure".to_string(),
            ));
        }
        Ok(vec![Convention {
            category: "naming".to_string(),
            pattern: "snake_case functions".to_string(),
            description: "Functions use snake_case".to_string(),
            confidence: 0.9,
            severity: "should-follow".to_string(),
            ..Convention::default()
        }])
    }

    async fn generate_walkthroughs(
        &self,
        _files: &[CodeFile],
        _architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Walkthrough>> {
        Ok(vec![Walkthrough {
            id: "first-request".to_string(),
            title: "Life of a request".to_string(),
            difficulty: "beginner".to_string(),
            estimated_minutes: 10,
            ..Walkthrough::default()
        }])
    }

    async fn analyze_env_setup(&self, _files: &[CodeFile]) -> Result<EnvSetupGuide> {
        Ok(EnvSetupGuide {
            setup_steps: vec![SetupStep {
                order: 1,
                category: "runtime".to_string(),
                title: "Install Rust".to_string(),
                command: Some("rustup default stable".to_string()),
                required: true,
                ..SetupStep::default()
            }],
            ..EnvSetupGuide::default()
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Deterministic toy embedding derived from the text length
        Ok(vec![1.0, text.len() as f32 % 7.0, 0.5])
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }
}

/// All services wired over in-memory stores and the scripted provider
pub struct TestHarness {
    pub provider: Arc<FakeProvider>,
    pub blobs: Arc<MemoryBlobStore>,
    pub records: Arc<MemoryRecordStore>,
    pub orchestrator: AnalysisOrchestrator,
    pub tracker: ProgressTracker,
}

pub fn harness() -> TestHarness {
    let provider = FakeProvider::new();
    let blobs = Arc::new(MemoryBlobStore::new());
    let records = Arc::new(MemoryRecordStore::new());
    let events = Arc::new(MemoryEventStore::new());

    let orchestrator =
        AnalysisOrchestrator::new(provider.clone(), blobs.clone(), records.clone());
    let tracker = ProgressTracker::new(events);

    TestHarness {
        provider,
        blobs,
        records,
        orchestrator,
        tracker,
    }
}

impl TestHarness {
    pub fn app_state(&self) -> AppState {
        AppState {
            orchestrator: self.orchestrator.clone(),
            tracker: self.tracker.clone(),
            retrieval: SemanticIndex::new(
                self.provider.clone(),
                self.blobs.clone(),
                CacheLayer::new(self.records.clone()),
            ),
            blobs: self.blobs.clone(),
            records: self.records.clone(),
        }
    }
}

pub fn sample_files() -> Vec<CodeFile> {
    [
        ("Cargo.toml", "[package]\nname = \"demo\""),
        ("src/main.rs", "fn main() { println!(\"hi\"); }"),
        ("src/auth.rs", "pub fn issue_token() {}"),
    ]
    .into_iter()
    .map(|(path, content)| CodeFile {
        path: path.to_string(),
        content: content.to_string(),
        size: content.len(),
    })
    .collect()
}

pub fn tech_stack() -> HashMap<String, String> {
    [("language", "rust"), ("framework", "axum")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Poll for a cascade-produced artifact; the cascade is fire-and-forget so
/// tests must wait for its tasks to land.
pub async fn wait_for_artifact(
    orchestrator: &AnalysisOrchestrator,
    repo_id: &str,
    kind: AnalysisKind,
) -> Option<Value> {
    for _ in 0..200 {
        if let Ok(Some(value)) = orchestrator.get_artifact(repo_id, kind).await {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}
