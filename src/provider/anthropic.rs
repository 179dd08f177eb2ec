//! Anthropic-backed AI provider
//!
//! Analysis artifacts come from the Anthropic messages API; embeddings come
//! from a Voyage-style embeddings endpoint. Model output is parsed
//! leniently: code fences are stripped and malformed JSON degrades to a
//! valid default structure with a logged warning.

use super::{parse_or_degraded, AiProvider};
use crate::error::{AriadneError, Result};
use crate::types::{
    now_iso, ArchitectureMap, CodeFile, Convention, EnvSetupGuide, Walkthrough,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for provider calls
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Max content characters included per key file in prompts
const KEY_FILE_CONTENT_CAP: usize = 4000;

/// Max key files included in prompts
const KEY_FILE_LIMIT: usize = 20;

/// Configuration for the Anthropic provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model id (default: claude-3-5-sonnet-latest)
    pub model: String,

    /// Messages API base URL
    pub base_url: String,

    /// Max tokens for analysis responses
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// Embeddings endpoint API key
    pub embed_api_key: String,

    /// Embeddings model name
    pub embed_model: String,

    /// Embeddings endpoint base URL
    pub embed_base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-5-sonnet-latest".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            max_tokens: 8192,
            temperature: 0.3,
            embed_api_key: env::var("VOYAGE_API_KEY").unwrap_or_default(),
            embed_model: "voyage-3-large".to_string(),
            embed_base_url: "https://api.voyageai.com/v1".to_string(),
        }
    }
}

/// Production AI provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            warn!("ANTHROPIC_API_KEY not set; analysis calls will fail until configured");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AriadneError::Provider(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn with_default() -> Result<Self> {
        Self::new(ProviderConfig::default())
    }

    /// Call the messages API once and return the first content block's text
    async fn invoke(&self, system: &str, user: String) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(AriadneError::Provider(
                "ANTHROPIC_API_KEY not set".to_string(),
            ));
        }

        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: system.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user,
            }],
        };

        debug!("invoking {} ({} prompt chars)", self.config.model, request.messages[0].content.len());

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AriadneError::Provider(format!(
                "messages API returned {}: {}",
                status, body
            )));
        }

        let parsed: MessagesResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AriadneError::Provider("empty response content".to_string()))
    }

    fn architecture_context(architecture: Option<&ArchitectureMap>) -> String {
        match architecture {
            Some(map) => serde_json::to_string_pretty(map)
                .unwrap_or_else(|_| "No architecture analysis available.".to_string()),
            None => "No architecture analysis available.".to_string(),
        }
    }
}

/// Newline-separated file paths, the prompt's view of the repo layout
fn build_file_tree(files: &[CodeFile]) -> String {
    files
        .iter()
        .map(|f| f.path.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Concatenated contents of the most informative files, size-capped
fn build_key_file_contents(files: &[CodeFile]) -> String {
    let mut ranked: Vec<&CodeFile> = files.iter().collect();
    // Entry points and manifests first, then shortest paths (roots) first
    ranked.sort_by_key(|f| {
        let name = f.path.rsplit('/').next().unwrap_or(&f.path);
        let priority = match name {
            "package.json" | "Cargo.toml" | "go.mod" | "pyproject.toml" => 0,
            "main.rs" | "lib.rs" | "index.ts" | "index.js" | "main.py" | "app.ts" => 1,
            _ => 2,
        };
        (priority, f.path.len())
    });

    ranked
        .iter()
        .take(KEY_FILE_LIMIT)
        .map(|f| {
            let content: String = f.content.chars().take(KEY_FILE_CONTENT_CAP).collect();
            format!("--- {} ---\n{}", f.path, content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

const ARCHITECTURE_SYSTEM: &str = "You are an expert software architect analyzing a codebase to help new developers onboard quickly.\n\
Return a JSON object with this exact structure:\n\
{\"nodes\": [{\"id\": \"string\", \"label\": \"string\", \"type\": \"module|service|config|entry|util\", \"files\": [\"string\"], \"description\": \"string\"}],\n\
 \"edges\": [{\"source\": \"string\", \"target\": \"string\", \"label\": \"string\"}],\n\
 \"techStack\": {\"key\": \"value\"},\n\
 \"summary\": \"2-3 sentence overview of the project\"}\n\
Return ONLY valid JSON, no markdown or explanation.";

const CONVENTIONS_SYSTEM: &str = "You are an expert code reviewer detecting the coding conventions of a codebase so new developers understand how things are done here.\n\
Return a JSON array: [{\"category\": \"string\", \"pattern\": \"string\", \"description\": \"string\", \"examples\": [\"file:line note\"], \"confidence\": 0.0, \"severity\": \"must-follow|should-follow|nice-to-have\", \"doExample\": \"string\", \"dontExample\": \"string\"}]\n\
Return ONLY a valid JSON array, no markdown or explanation.";

const WALKTHROUGH_SYSTEM: &str = "You are an expert developer mentor generating 3-5 step-by-step walkthroughs of the most important flows in a codebase for new developers.\n\
Return a JSON array: [{\"id\": \"slug\", \"title\": \"string\", \"description\": \"string\", \"difficulty\": \"beginner|intermediate|advanced\", \"estimatedMinutes\": 10, \"steps\": [{\"stepNumber\": 1, \"file\": \"path\", \"lineRange\": {\"start\": 1, \"end\": 20}, \"title\": \"string\", \"explanation\": \"string\", \"codeSnippet\": \"string\"}], \"prerequisites\": [\"string\"], \"relatedModules\": [\"string\"]}]\n\
Return ONLY a valid JSON array, no markdown or explanation.";

const ENV_SETUP_SYSTEM: &str = "You are an expert DevOps engineer generating a verified environment setup guide from a repository's configuration files.\n\
Return a JSON object: {\"setupSteps\": [{\"order\": 1, \"category\": \"runtime|package-manager|database|cache|env-vars|docker|build|test|other\", \"title\": \"string\", \"command\": \"string\", \"description\": \"string\", \"required\": true, \"verifyCommand\": \"string\"}], \"conflicts\": [{\"severity\": \"error|warning\", \"description\": \"string\", \"sources\": [\"string\"], \"resolution\": \"string\"}], \"missingPieces\": [\"string\"]}\n\
Return ONLY valid JSON, no markdown or explanation.";

#[async_trait]
impl AiProvider for AnthropicProvider {
    async fn analyze_architecture(&self, files: &[CodeFile]) -> Result<ArchitectureMap> {
        let user = format!(
            "Here is the file tree of the project:\n\n{}\n\nHere are the key file contents:\n\n{}",
            build_file_tree(files),
            build_key_file_contents(files)
        );
        let raw = self.invoke(ARCHITECTURE_SYSTEM, user).await?;
        let map = parse_or_degraded::<ArchitectureMap>(
            &raw,
            "architecture",
            ArchitectureMap::degraded(),
        );

        let dangling = map.dangling_edge_count();
        if dangling > 0 {
            warn!("architecture map has {} edges referencing unknown nodes", dangling);
        }
        Ok(map)
    }

    async fn detect_conventions(
        &self,
        files: &[CodeFile],
        architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Convention>> {
        let user = format!(
            "## Architecture context\n\n{}\n\n## Key file contents\n\n{}",
            Self::architecture_context(architecture),
            build_key_file_contents(files)
        );
        let raw = self.invoke(CONVENTIONS_SYSTEM, user).await?;
        Ok(parse_or_degraded::<Vec<Convention>>(&raw, "conventions", Vec::new()))
    }

    async fn generate_walkthroughs(
        &self,
        files: &[CodeFile],
        architecture: Option<&ArchitectureMap>,
    ) -> Result<Vec<Walkthrough>> {
        let user = format!(
            "## Architecture context\n\n{}\n\n## Key file contents\n\n{}",
            Self::architecture_context(architecture),
            build_key_file_contents(files)
        );
        let raw = self.invoke(WALKTHROUGH_SYSTEM, user).await?;
        let mut walkthroughs =
            parse_or_degraded::<Vec<Walkthrough>>(&raw, "walkthroughs", Vec::new());
        let generated_at = now_iso();
        for w in &mut walkthroughs {
            w.generated_at = generated_at.clone();
        }
        Ok(walkthroughs)
    }

    async fn analyze_env_setup(&self, files: &[CodeFile]) -> Result<EnvSetupGuide> {
        // Config and docs carry the setup signal; source files add noise
        let relevant: Vec<CodeFile> = files
            .iter()
            .filter(|f| {
                let name = f.path.rsplit('/').next().unwrap_or(&f.path).to_lowercase();
                name.starts_with("readme")
                    || name.starts_with("contributing")
                    || name.starts_with(".env.")
                    || name.starts_with("dockerfile")
                    || name.starts_with("docker-compose")
                    || matches!(
                        name.as_str(),
                        "package.json"
                            | "cargo.toml"
                            | "go.mod"
                            | "pyproject.toml"
                            | "requirements.txt"
                            | "makefile"
                            | ".nvmrc"
                            | ".tool-versions"
                    )
            })
            .cloned()
            .collect();

        let user = format!(
            "## Configuration and documentation files\n\n{}",
            build_key_file_contents(&relevant)
        );
        let raw = self.invoke(ENV_SETUP_SYSTEM, user).await?;
        Ok(parse_or_degraded::<EnvSetupGuide>(
            &raw,
            "env-setup",
            EnvSetupGuide::default(),
        ))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.config.embed_api_key.is_empty() {
            return Err(AriadneError::Provider("VOYAGE_API_KEY not set".to_string()));
        }

        let request = EmbedRequest {
            input: vec![text.to_string()],
            model: self.config.embed_model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.embed_base_url))
            .header("Authorization", format!("Bearer {}", self.config.embed_api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AriadneError::Provider(format!(
                "embeddings API returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AriadneError::Provider("empty embedding response".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
