//! Semantic retrieval traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::Result;

/// A single search hit from the legal corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk text.
    pub content: String,
    /// Similarity score (higher is closer).
    pub score: f32,
    /// Source metadata such as `document_id` and `page`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Similarity search over embedded documents.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` hits for `text`, best first.
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}
