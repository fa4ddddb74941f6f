//! Retrieval-augmented pipeline.
//!
//! Wires the page fetcher, embedder, vector index and language model into
//! the three operations the HTTP surface exposes: analyze a page into
//! indexed chunks, answer a question from retrieved chunks, and clear a
//! page's chunks.
//!
//! All collaborators are passed in explicitly, so tests can substitute
//! fakes for the network-facing pieces.

use std::sync::Arc;

use crate::chunker::split_into_chunks;
use crate::embedding::Embedder;
use crate::errors::PipelineError;
use crate::index::{ChunkRecord, VectorIndex};
use crate::llm::LlmClient;
use crate::scrape::PageFetcher;

/// Chunking and retrieval parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between neighboring chunks
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Expected embedding vector length; provider output is checked
    /// against it before anything reaches the index
    pub embedding_dimension: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
            top_k: crate::config::DEFAULT_TOP_K,
            embedding_dimension: crate::config::DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

pub struct RagPipeline {
    fetcher: Arc<dyn PageFetcher>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            index,
            llm,
            config,
        }
    }

    /// Fetch a page, chunk it, embed the chunks and upsert them into the
    /// index under deterministic `{url}_{index}` ids.
    ///
    /// Returns the number of chunks stored. No retry and no compensating
    /// deletion on partial upsert.
    pub async fn analyze(&self, url: &str) -> Result<usize, PipelineError> {
        let content = self.fetcher.fetch(url).await?;

        let chunks = split_into_chunks(
            &content,
            url,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(PipelineError::EmptyContent);
        }
        tracing::info!("Split {} into {} chunks", url, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(PipelineError::Embedding(format!(
                "embedded {} of {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }

        let items: Vec<(ChunkRecord, Vec<f32>)> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let record = ChunkRecord {
                    chunk_id: chunk.chunk_id(),
                    text: chunk.text,
                    source: chunk.source,
                };
                (record, embedding)
            })
            .collect();
        let stored = items.len();

        self.index.upsert(items).await?;
        tracing::info!("Indexed {} chunks for {}", stored, url);

        Ok(stored)
    }

    /// Embed the question, retrieve the nearest chunks across the whole
    /// index and generate an answer grounded in them.
    ///
    /// An empty index is not an error: generation still runs, with an
    /// empty context section.
    pub async fn answer(&self, question: &str) -> Result<String, PipelineError> {
        let query_embedding = self.embedder.embed_query(question).await?;
        self.check_dimension(&query_embedding)?;

        let results = self
            .index
            .query(&query_embedding, self.config.top_k)
            .await?;
        tracing::info!("Retrieved {} chunks for question", results.len());

        let context = results
            .iter()
            .map(|scored| scored.record.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = build_prompt(&context, question);
        self.llm.generate(&prompt).await
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), PipelineError> {
        if embedding.len() != self.config.embedding_dimension {
            return Err(PipelineError::Embedding(format!(
                "expected {}-dimension embedding, got {}",
                self.config.embedding_dimension,
                embedding.len()
            )));
        }
        Ok(())
    }

    /// Delete every indexed chunk whose source URL matches.
    ///
    /// Succeeds even when nothing matched.
    pub async fn clear(&self, url: &str) -> Result<(), PipelineError> {
        let deleted = self.index.delete_by_source(url).await?;
        tracing::info!("Cleared {} chunks for {}", deleted, url);
        Ok(())
    }
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful AI assistant that answers questions based on webpage content.\n\
         Use the following pieces of context to answer the question at the end.\n\n\
         Format your response clearly:\n\
         - Use bullet points for lists\n\
         - Break information into short paragraphs\n\
         - Use numbers for step-by-step instructions\n\
         - Keep sentences concise and readable\n\n\
         Context: {context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}
