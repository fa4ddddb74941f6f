//! Pinecone-backed vector index.
//!
//! Talks to a serverless Pinecone index over its data-plane REST API.
//! Chunk text and source URL travel as vector metadata.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::errors::PipelineError;

pub struct PineconeIndex {
    host: String,
    api_key: String,
    client: Client,
}

impl PineconeIndex {
    /// `host` is the index-specific data-plane URL from the Pinecone console.
    pub fn new(host: String, api_key: String) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, PipelineError> {
        let url = format!("{}{}", self.host, path);
        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Store(format!(
                "Pinecone {} returned {}: {}",
                path, status, text
            )));
        }

        Ok(res)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct DescribeStatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: u64,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, items: Vec<(ChunkRecord, Vec<f32>)>) -> Result<(), PipelineError> {
        if items.is_empty() {
            return Ok(());
        }

        let vectors: Vec<serde_json::Value> = items
            .iter()
            .map(|(record, embedding)| {
                json!({
                    "id": record.chunk_id,
                    "values": embedding,
                    "metadata": {
                        "text": record.text,
                        "source": record.source,
                    }
                })
            })
            .collect();

        self.post("/vectors/upsert", json!({ "vectors": vectors }))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let res = self
            .post(
                "/query",
                json!({
                    "vector": query_embedding,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        let payload: QueryResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        let results = payload
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                let text = metadata
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let source = metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                ScoredChunk {
                    record: ChunkRecord {
                        chunk_id: m.id,
                        text,
                        source,
                    },
                    score: m.score,
                }
            })
            .collect();

        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, PipelineError> {
        self.post(
            "/vectors/delete",
            json!({
                "filter": { "source": { "$eq": source } }
            }),
        )
        .await?;

        // Pinecone's delete response carries no count.
        Ok(0)
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        let res = self.post("/describe_index_stats", json!({})).await?;

        let payload: DescribeStatsResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        Ok(payload.total_vector_count as usize)
    }
}
