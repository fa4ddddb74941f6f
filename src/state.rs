use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::config::{AppConfig, AppPaths, IndexBackend};
use crate::embedding::NomicEmbedder;
use crate::index::{PineconeIndex, SqliteIndex, VectorIndex};
use crate::llm::GeminiClient;
use crate::pipeline::{PipelineConfig, RagPipeline};
use crate::scrape::HttpPageFetcher;

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub pipeline: RagPipeline,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build all pipeline collaborators once and hand them to the
    /// pipeline explicitly. Nothing here is a process-wide singleton.
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let config = AppConfig::from_env();

        let fetcher = Arc::new(HttpPageFetcher::new().context("Failed to build HTTP client")?);

        let embedder = Arc::new(NomicEmbedder::new(
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
        ));

        let index: Arc<dyn VectorIndex> = match config.index_backend {
            IndexBackend::Pinecone => {
                let host = config
                    .pinecone_host
                    .clone()
                    .context("PINECONE_INDEX_HOST is required for the pinecone backend")?;
                let api_key = config
                    .pinecone_api_key
                    .clone()
                    .context("PINECONE_API_KEY is required for the pinecone backend")?;
                tracing::info!("Using Pinecone index at {}", host);
                Arc::new(PineconeIndex::new(host, api_key))
            }
            IndexBackend::Sqlite => {
                tracing::info!("Using local index at {}", paths.index_db_path.display());
                Arc::new(
                    SqliteIndex::new(paths.index_db_path.clone())
                        .await
                        .context("Failed to open local vector index")?,
                )
            }
        };

        let llm = Arc::new(GeminiClient::new(
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.llm_api_key.clone(),
        ));

        let pipeline = RagPipeline::new(
            fetcher,
            embedder,
            index,
            llm,
            PipelineConfig {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                top_k: config.top_k,
                embedding_dimension: config.embedding_dimension,
            },
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            pipeline,
            started_at: Utc::now(),
        }))
    }
}
