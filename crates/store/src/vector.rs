//! In-memory vector store implementation.
//!
//! A simple cosine-similarity index over embedded legal text chunks. It is the
//! default retrieval backend and the reference for the Qdrant adapter.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use paralegal_core::{
    traits::{LlmClient, Retriever, SearchHit},
    Result,
};

#[derive(Debug, Clone)]
struct IndexedChunk {
    content: String,
    embedding: Vec<f32>,
    metadata: HashMap<String, String>,
}

/// Simple in-memory vector store.
pub struct SimpleVectorStore {
    embedder: Arc<dyn LlmClient>,
    data: DashMap<String, IndexedChunk>,
}

impl SimpleVectorStore {
    /// Create an empty store that embeds text with `embedder`.
    pub fn new(embedder: Arc<dyn LlmClient>) -> Self {
        Self {
            embedder,
            data: DashMap::new(),
        }
    }

    /// Embed and index a chunk of text.
    pub async fn add_document(
        &self,
        id: &str,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let embedding = self.embedder.embed(content).await?;
        self.insert(id, content, embedding, metadata);
        Ok(())
    }

    /// Index a chunk whose embedding is already known.
    pub fn insert(
        &self,
        id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: HashMap<String, String>,
    ) {
        self.data.insert(
            id.to_string(),
            IndexedChunk {
                content: content.to_string(),
                embedding,
                metadata,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(v1: &[f32], v2: &[f32]) -> f32 {
        if v1.len() != v2.len() {
            return 0.0;
        }

        let dot_product: f32 = v1.iter().zip(v2.iter()).map(|(a, b)| a * b).sum();
        let magnitude1: f32 = v1.iter().map(|a| a * a).sum::<f32>().sqrt();
        let magnitude2: f32 = v2.iter().map(|a| a * a).sum::<f32>().sqrt();

        if magnitude1 == 0.0 || magnitude2 == 0.0 {
            return 0.0;
        }

        dot_product / (magnitude1 * magnitude2)
    }
}

#[async_trait]
impl Retriever for SimpleVectorStore {
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed(text).await?;

        let mut hits: Vec<SearchHit> = self
            .data
            .iter()
            .map(|chunk| {
                let mut metadata = chunk.metadata.clone();
                metadata
                    .entry("document_id".to_string())
                    .or_insert_with(|| chunk.key().clone());
                SearchHit {
                    content: chunk.content.clone(),
                    score: Self::cosine_similarity(&query_embedding, &chunk.embedding),
                    metadata,
                }
            })
            .collect();

        // Sort by score descending
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        tracing::debug!(results = hits.len(), top_k, "In-memory vector search");
        Ok(hits)
    }
}
