//! SQLite-backed vector index.
//!
//! In-process store using SQLite for chunk rows and brute-force cosine
//! similarity for search. Fine at single-page-analysis scale.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::errors::PipelineError;

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub async fn new(db_path: PathBuf) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> ChunkRecord {
        ChunkRecord {
            chunk_id: row.get("chunk_id"),
            text: row.get("content"),
            source: row.get("source"),
        }
    }
}

fn store_err<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::Store(err.to_string())
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, items: Vec<(ChunkRecord, Vec<f32>)>) -> Result<(), PipelineError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for (record, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);

            sqlx::query(
                "INSERT OR REPLACE INTO chunks (chunk_id, content, source, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&record.chunk_id)
            .bind(&record.text)
            .bind(&record.source)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let rows = sqlx::query("SELECT chunk_id, content, source, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                Some(ScoredChunk {
                    record: Self::row_to_record(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, PipelineError> {
        let result = sqlx::query("DELETE FROM chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> SqliteIndex {
        let tmp = std::env::temp_dir().join(format!(
            "pagepilot-index-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteIndex::new(tmp).await.unwrap()
    }

    fn make_record(id: &str, text: &str, source: &str) -> ChunkRecord {
        ChunkRecord {
            chunk_id: id.to_string(),
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_query() {
        let index = test_index().await;

        index
            .upsert(vec![
                (make_record("u_0", "the sky is blue", "u"), vec![1.0, 0.0, 0.0]),
                (make_record("u_1", "the sea is deep", "u"), vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 2);

        let results = index.query(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.chunk_id, "u_0");
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn upsert_same_id_overwrites() {
        let index = test_index().await;

        index
            .upsert(vec![(make_record("u_0", "first version", "u"), vec![1.0])])
            .await
            .unwrap();
        index
            .upsert(vec![(make_record("u_0", "second version", "u"), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);

        let results = index.query(&[1.0], 3).await.unwrap();
        assert_eq!(results[0].record.text, "second version");
    }

    #[tokio::test]
    async fn delete_by_source_removes_only_matching() {
        let index = test_index().await;

        index
            .upsert(vec![
                (make_record("a_0", "page a", "https://a.example"), vec![1.0]),
                (make_record("a_1", "more a", "https://a.example"), vec![1.0]),
                (make_record("b_0", "page b", "https://b.example"), vec![1.0]),
            ])
            .await
            .unwrap();

        let deleted = index.delete_by_source("https://a.example").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(index.count().await.unwrap(), 1);

        let remaining = index.query(&[1.0], 10).await.unwrap();
        assert!(remaining
            .iter()
            .all(|s| s.record.source == "https://b.example"));
    }

    #[tokio::test]
    async fn query_with_zero_top_k_returns_nothing() {
        let index = test_index().await;

        index
            .upsert(vec![(make_record("u_0", "some text", "u"), vec![1.0])])
            .await
            .unwrap();

        let results = index.query(&[1.0], 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn query_on_empty_index_is_empty() {
        let index = test_index().await;
        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }
}
