//! Semantic retrieval over embedded code chunks
//!
//! Files are chunked into overlapping windows, embedded once through the
//! provider, and cached as a blob per repo. Queries embed the query text,
//! rank chunks by cosine similarity, and deduplicate to the best chunk per
//! source file.

use crate::cache::{CacheLayer, CacheNamespace, DEFAULT_CACHE_TTL_SECS};
use crate::error::Result;
use crate::provider::AiProvider;
use crate::storage::{analysis_output_key, BlobStore};
use crate::types::CodeFile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Characters per chunk window
const CHUNK_SIZE: usize = 2000;

/// Overlap between consecutive windows
const CHUNK_OVERLAP: usize = 200;

/// Max files embedded per repo (cost control)
const MAX_EMBEDDED_FILES: usize = 100;

/// Blob suffix under which a repo's embedding set is cached
const EMBEDDINGS_KIND: &str = "embeddings";

/// One embedded chunk of a source file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedChunk {
    pub path: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub chunk_index: usize,
}

/// One ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub content: String,
    pub score: f32,
}

/// Cosine similarity; 0 when lengths differ or either norm is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Split content into overlapping fixed-size windows on char boundaries
pub fn chunk_text(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + CHUNK_SIZE).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - CHUNK_OVERLAP;
    }
    chunks
}

/// Rank chunks against a query vector, keeping the single best chunk per
/// source file, top K overall.
pub fn rank_chunks(
    query_embedding: &[f32],
    chunks: &[EmbeddedChunk],
    top_k: usize,
) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = chunks
        .iter()
        .map(|c| SearchResult {
            path: c.path.clone(),
            content: c.content.clone(),
            score: cosine_similarity(query_embedding, &c.embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for item in scored {
        if results.len() >= top_k {
            break;
        }
        if seen.insert(item.path.clone()) {
            results.push(item);
        }
    }
    results
}

/// Whether a file is worth embedding at all
fn is_embeddable(file: &CodeFile) -> bool {
    file.content.len() > 50
        && file.content.len() < 50_000
        && !file.path.contains("node_modules")
        && !file.path.ends_with(".lock")
        && !file.path.ends_with(".min.js")
}

/// Semantic search service over injected capabilities
#[derive(Clone)]
pub struct SemanticIndex {
    provider: Arc<dyn AiProvider>,
    blobs: Arc<dyn BlobStore>,
    cache: CacheLayer,
}

impl SemanticIndex {
    pub fn new(provider: Arc<dyn AiProvider>, blobs: Arc<dyn BlobStore>, cache: CacheLayer) -> Self {
        Self {
            provider,
            blobs,
            cache,
        }
    }

    /// Cached embedding set for a repo, generating and caching it from the
    /// supplied files on first use. An empty cached set counts as absent.
    pub async fn get_or_create_embeddings(
        &self,
        repo_id: &str,
        files: &[CodeFile],
    ) -> Result<Vec<EmbeddedChunk>> {
        let key = analysis_output_key(repo_id, EMBEDDINGS_KIND);

        match self.blobs.get_json(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<EmbeddedChunk>>(value) {
                Ok(cached) if !cached.is_empty() => {
                    debug!("using cached embeddings for {} ({} chunks)", repo_id, cached.len());
                    return Ok(cached);
                }
                Ok(_) => {}
                Err(err) => warn!("cached embeddings unreadable for {}: {}", repo_id, err),
            },
            Ok(None) => {}
            Err(err) => warn!("embedding cache read failed for {}: {}", repo_id, err),
        }

        let candidates: Vec<&CodeFile> = files
            .iter()
            .filter(|f| is_embeddable(f))
            .take(MAX_EMBEDDED_FILES)
            .collect();

        info!(
            "generating embeddings for {} ({} files)",
            repo_id,
            candidates.len()
        );

        let mut chunks = Vec::new();
        for file in candidates {
            for (chunk_index, chunk) in chunk_text(&file.content).into_iter().enumerate() {
                let text = format!("File: {}\n\n{}", file.path, chunk);
                match self.provider.embed(&text).await {
                    Ok(embedding) => chunks.push(EmbeddedChunk {
                        path: file.path.clone(),
                        content: chunk,
                        embedding,
                        chunk_index,
                    }),
                    Err(err) => {
                        warn!("failed to embed {} chunk {}: {}", file.path, chunk_index, err);
                    }
                }
            }
        }

        self.blobs
            .put_json(&key, &serde_json::to_value(&chunks)?)
            .await?;
        Ok(chunks)
    }

    /// Full pipeline: embed the query (cached per repo), rank cached
    /// chunks, return top-K files.
    pub async fn search(
        &self,
        repo_id: &str,
        query: &str,
        files: &[CodeFile],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding: Vec<f32> = self
            .cache
            .through(
                CacheNamespace::EmbeddingQuery,
                repo_id,
                query,
                DEFAULT_CACHE_TTL_SECS,
                || async { self.provider.embed(query).await },
            )
            .await?;
        let chunks = self.get_or_create_embeddings(repo_id, files).await?;
        if chunks.is_empty() {
            warn!("no embeddings available for {}", repo_id);
            return Ok(Vec::new());
        }
        Ok(rank_chunks(&query_embedding, &chunks, top_k))
    }

    /// Drop the cached embedding set so the next query regenerates it
    pub async fn invalidate(&self, repo_id: &str) -> Result<()> {
        let key = analysis_output_key(repo_id, EMBEDDINGS_KIND);
        self.blobs
            .put_json(&key, &serde_json::json!([]))
            .await?;
        info!("invalidated embeddings for {}", repo_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, idx: usize, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            path: path.to_string(),
            content: format!("{}#{}", path, idx),
            embedding,
            chunk_index: idx,
        }
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_norm_and_length_mismatch() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_chunk_text_windows_and_overlap() {
        let content = "a".repeat(CHUNK_SIZE + 500);
        let chunks = chunk_text(&content);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), CHUNK_SIZE);
        // Second window starts CHUNK_OVERLAP chars before the first ends
        assert_eq!(chunks[1].chars().count(), 500 + CHUNK_OVERLAP);
    }

    #[test]
    fn test_chunk_text_short_content_single_chunk() {
        let chunks = chunk_text("short");
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn test_chunk_text_multibyte_safe() {
        let content = "é".repeat(CHUNK_SIZE + 100);
        let chunks = chunk_text(&content);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_rank_chunks_orders_by_similarity() {
        let chunks = vec![
            chunk("far.rs", 0, vec![0.0, 1.0]),
            chunk("near.rs", 0, vec![1.0, 0.1]),
        ];
        let results = rank_chunks(&[1.0, 0.0], &chunks, 10);
        assert_eq!(results[0].path, "near.rs");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_rank_chunks_dedupes_by_file() {
        let chunks = vec![
            chunk("a.rs", 0, vec![1.0, 0.0]),
            chunk("a.rs", 1, vec![0.9, 0.1]),
            chunk("b.rs", 0, vec![0.5, 0.5]),
        ];
        let results = rank_chunks(&[1.0, 0.0], &chunks, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "a.rs");
        assert_eq!(results[0].content, "a.rs#0");
    }

    #[test]
    fn test_rank_chunks_respects_top_k() {
        let chunks: Vec<EmbeddedChunk> = (0..10)
            .map(|i| chunk(&format!("f{}.rs", i), 0, vec![1.0, i as f32 / 10.0]))
            .collect();
        let results = rank_chunks(&[1.0, 0.0], &chunks, 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_is_embeddable_filters() {
        let ok = CodeFile {
            path: "src/main.rs".into(),
            content: "x".repeat(100),
            size: 100,
        };
        assert!(is_embeddable(&ok));

        let too_small = CodeFile {
            path: "src/tiny.rs".into(),
            content: "x".into(),
            size: 1,
        };
        assert!(!is_embeddable(&too_small));

        let vendored = CodeFile {
            path: "node_modules/pkg/index.js".into(),
            content: "x".repeat(100),
            size: 100,
        };
        assert!(!is_embeddable(&vendored));
    }
}
