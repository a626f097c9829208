//! Qdrant vector database retriever.
//!
//! Chunks of legal text are stored as points whose payload carries the
//! chunk `content` and its source metadata (`document_id`, `page`, ...).

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, vectors_config::Config as VectorsConfigEnum, CreateCollectionBuilder, Distance,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder, VectorsConfig,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;

use paralegal_core::{
    traits::{LlmClient, Retriever, SearchHit},
    Error, Result,
};

/// Qdrant-backed retriever for the legal corpus.
pub struct QdrantRetriever {
    client: Qdrant,
    embedder: Arc<dyn LlmClient>,
    collection_name: String,
    vector_size: u64,
}

impl QdrantRetriever {
    /// Connect to Qdrant and make sure the collection exists.
    ///
    /// # Arguments
    /// * `url` - Qdrant server URL (e.g., "http://localhost:6334")
    /// * `collection_name` - Name of the collection holding the chunks
    /// * `vector_size` - Dimension of the embedding vectors
    /// * `embedder` - Client used to embed queries and new chunks
    pub async fn new(
        url: &str,
        collection_name: &str,
        vector_size: u64,
        embedder: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to connect to Qdrant: {}", e)))?;

        let retriever = Self {
            client,
            embedder,
            collection_name: collection_name.to_string(),
            vector_size,
        };

        retriever.ensure_collection().await?;

        Ok(retriever)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| Error::retrieval(format!("Failed to list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection_name);

        if !exists {
            tracing::info!(collection = %self.collection_name, "Creating Qdrant collection");

            let vectors_config = VectorsConfig {
                config: Some(VectorsConfigEnum::Params(
                    VectorParamsBuilder::new(self.vector_size, Distance::Cosine).build(),
                )),
            };

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection_name)
                        .vectors_config(vectors_config),
                )
                .await
                .map_err(|e| Error::retrieval(format!("Failed to create collection: {}", e)))?;
        }

        Ok(())
    }

    /// Embed and upsert one chunk. Returns the generated point id.
    pub async fn add_document(
        &self,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let embedding = self.embedder.embed(content).await?;
        let id = uuid::Uuid::new_v4().to_string();

        let point = PointStruct::new(id.clone(), embedding, to_payload(&metadata, content));

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, vec![point]))
            .await
            .map_err(|e| Error::retrieval(format!("Failed to upsert point: {}", e)))?;

        tracing::debug!(id = %id, "Added chunk to Qdrant");
        Ok(id)
    }
}

fn string_value(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn to_payload(metadata: &HashMap<String, String>, content: &str) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = metadata
        .iter()
        .map(|(k, v)| (k.clone(), string_value(v)))
        .collect();
    payload.insert("content".to_string(), string_value(content));
    payload
}

/// Split a point payload into chunk text and metadata.
///
/// Numeric payload fields (e.g. page numbers written by ingestion scripts)
/// are kept as their decimal text.
fn from_payload(payload: HashMap<String, QdrantValue>) -> (String, HashMap<String, String>) {
    let mut metadata = HashMap::new();
    let mut content = String::new();

    for (key, value) in payload {
        let text = match value.kind {
            Some(Kind::StringValue(s)) => s,
            Some(Kind::IntegerValue(i)) => i.to_string(),
            Some(Kind::DoubleValue(d)) => d.to_string(),
            Some(Kind::BoolValue(b)) => b.to_string(),
            _ => continue,
        };
        if key == "content" {
            content = text;
        } else {
            metadata.insert(key, text);
        }
    }

    (content, metadata)
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed(text).await?;

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, query_embedding, top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Error::retrieval(format!("Failed to search: {}", e)))?;

        let hits: Vec<SearchHit> = search_result
            .result
            .into_iter()
            .map(|point| {
                let (content, metadata) = from_payload(point.payload);
                SearchHit {
                    content,
                    score: point.score,
                    metadata,
                }
            })
            .collect();

        tracing::debug!(
            collection = %self.collection_name,
            results = hits.len(),
            top_k,
            "Qdrant search"
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), "it-act".to_string());
        let payload = to_payload(&metadata, "Section 192");

        let (content, back) = from_payload(payload);
        assert_eq!(content, "Section 192");
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_numeric_payload_fields_become_text() {
        let mut payload = HashMap::new();
        payload.insert("content".to_string(), string_value("chunk"));
        payload.insert(
            "page".to_string(),
            QdrantValue {
                kind: Some(Kind::IntegerValue(14)),
            },
        );

        let (_, metadata) = from_payload(payload);
        assert_eq!(metadata["page"], "14");
    }
}
