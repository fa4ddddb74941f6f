//! Vector index abstraction.
//!
//! The pipeline talks to a `VectorIndex` for upsert, cosine similarity
//! search and delete-by-source. `PineconeIndex` is the hosted backend;
//! `SqliteIndex` is the local, zero-setup one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

mod pinecone;
mod sqlite;

pub use pinecone::PineconeIndex;
pub use sqlite::SqliteIndex;

/// An indexed chunk: id, text and the URL it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic identifier (`{url}_{index}`).
    pub chunk_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Source URL.
    pub source: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract vector index with upsert, similarity search and
/// metadata-filtered deletion.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert chunks with their embeddings, keyed by chunk id.
    async fn upsert(&self, items: Vec<(ChunkRecord, Vec<f32>)>) -> Result<(), PipelineError>;

    /// Return the `top_k` chunks nearest to the query embedding,
    /// searched across the entire index.
    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError>;

    /// Delete every chunk whose source equals `source`. Returns the number
    /// of deleted chunks where the backend reports one (0 otherwise).
    async fn delete_by_source(&self, source: &str) -> Result<usize, PipelineError>;

    /// Total number of indexed chunks.
    async fn count(&self) -> Result<usize, PipelineError>;
}
