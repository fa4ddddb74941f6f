//! Request handlers for the Page Pilot HTTP surface.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub url: String,
}

pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Server is alive!",
        "started_at": state.started_at.to_rfc3339(),
    }))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.pipeline.analyze(&payload.url).await.map_err(|err| {
        tracing::error!("Analyze failed for {}: {}", payload.url, err);
        err
    })?;

    tracing::info!("Analyzed {} into {} chunks", payload.url, stored);
    Ok(Json(json!({"status": "success"})))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
    }

    let answer = state
        .pipeline
        .answer(&payload.question)
        .await
        .map_err(|err| {
            tracing::error!("Chat failed: {}", err);
            err
        })?;

    Ok(Json(ChatResponse { answer }))
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ClearRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.pipeline.clear(&payload.url).await.map_err(|err| {
        tracing::error!("Clear failed for {}: {}", payload.url, err);
        err
    })?;

    Ok(Json(json!({"status": "success"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::embedding::Embedder;
    use crate::errors::PipelineError;
    use crate::index::SqliteIndex;
    use crate::llm::LlmClient;
    use crate::pipeline::{PipelineConfig, RagPipeline};
    use crate::scrape::PageFetcher;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::Utc;

    struct StaticFetcher {
        content: Option<String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, PipelineError> {
            self.content
                .clone()
                .ok_or_else(|| PipelineError::Fetch("simulated network error".to_string()))
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Fails every call; chat validation must reject before reaching it.
    struct UnreachableEmbedder;

    #[async_trait]
    impl Embedder for UnreachableEmbedder {
        async fn embed_documents(&self, _: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Err(PipelineError::Embedding("should not be called".to_string()))
        }

        async fn embed_query(&self, _: &str) -> Result<Vec<f32>, PipelineError> {
            Err(PipelineError::Embedding("should not be called".to_string()))
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, PipelineError> {
            Ok("the page covers testing".to_string())
        }
    }

    async fn test_state(fetch_content: Option<String>, embedder: Arc<dyn Embedder>) -> Arc<AppState> {
        let dir = tempfile::tempdir().unwrap().into_path();
        let paths = crate::config::AppPaths {
            user_data_dir: dir.clone(),
            log_dir: dir.join("logs"),
            index_db_path: dir.join("index.db"),
        };
        let index = Arc::new(SqliteIndex::new(paths.index_db_path.clone()).await.unwrap());

        let pipeline = RagPipeline::new(
            Arc::new(StaticFetcher {
                content: fetch_content,
            }),
            embedder,
            index,
            Arc::new(EchoLlm),
            PipelineConfig {
                chunk_size: 100,
                chunk_overlap: 20,
                top_k: 3,
                embedding_dimension: 2,
            },
        );

        Arc::new(AppState {
            paths: Arc::new(paths),
            config: AppConfig::from_env(),
            pipeline,
            started_at: Utc::now(),
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_reports_alive_with_start_time() {
        let state = test_state(None, Arc::new(UnitEmbedder)).await;
        let response = root(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Server is alive!");
        assert!(body["started_at"].is_string());
    }

    #[tokio::test]
    async fn analyze_returns_success() {
        let content = "A page about handler testing. ".repeat(10);
        let state = test_state(Some(content), Arc::new(UnitEmbedder)).await;

        let response = analyze(
            State(state),
            Json(AnalyzeRequest {
                url: "https://example.com".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn analyze_fetch_failure_is_internal_error() {
        let state = test_state(None, Arc::new(UnitEmbedder)).await;

        let result = analyze(
            State(state),
            Json(AnalyzeRequest {
                url: "https://example.com".to_string(),
            }),
        )
        .await;

        let err = match result {
            Ok(_) => panic!("expected analyze to fail"),
            Err(err) => err,
        };
        assert!(matches!(err, ApiError::Internal(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn chat_rejects_blank_question_before_retrieval() {
        let state = test_state(None, Arc::new(UnreachableEmbedder)).await;

        let result = chat(
            State(state),
            Json(ChatRequest {
                question: "   ".to_string(),
            }),
        )
        .await;

        let err = match result {
            Ok(_) => panic!("expected chat to reject a blank question"),
            Err(err) => err,
        };
        assert!(matches!(err, ApiError::BadRequest(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_answers_after_analyze() {
        let content = "A page about handler testing. ".repeat(10);
        let state = test_state(Some(content), Arc::new(UnitEmbedder)).await;

        analyze(
            State(state.clone()),
            Json(AnalyzeRequest {
                url: "https://example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        let response = chat(
            State(state),
            Json(ChatRequest {
                question: "what is this page about?".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], "the page covers testing");
    }

    #[tokio::test]
    async fn clear_returns_success() {
        let content = "A page about handler testing. ".repeat(10);
        let state = test_state(Some(content), Arc::new(UnitEmbedder)).await;

        analyze(
            State(state.clone()),
            Json(AnalyzeRequest {
                url: "https://example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        let response = clear(
            State(state),
            Json(ClearRequest {
                url: "https://example.com".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
    }
}
