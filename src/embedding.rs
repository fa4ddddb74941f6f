//! Embedding provider client.
//!
//! The pipeline embeds documents at index time and queries at question
//! time; providers distinguish the two so retrieval quality holds up.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::errors::PipelineError;

/// Produces fixed-dimension embedding vectors for text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed document chunks for indexing.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

/// Client for the Nomic Atlas text embedding API (768-dim vectors).
pub struct NomicEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

impl NomicEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }

    async fn embed(&self, texts: &[String], task_type: &str) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/embedding/text", self.base_url);

        let body = json!({
            "model": self.model,
            "texts": texts,
            "task_type": task_type,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding(format!(
                "embedding API returned {}: {}",
                status, text
            )));
        }

        let payload: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        if payload.embeddings.len() != texts.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }

        Ok(payload.embeddings)
    }
}

#[async_trait]
impl Embedder for NomicEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed(texts, "search_document").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut embeddings = self.embed(&[text.to_string()], "search_query").await?;
        embeddings
            .pop()
            .ok_or_else(|| PipelineError::Embedding("empty embedding response".to_string()))
    }
}
