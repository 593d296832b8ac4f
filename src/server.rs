//! HTTP API over the question answering pipeline.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question from the indexed documents |
//! | `GET`  | `/ask` | Usage hint |
//! | `POST` | `/ingest` | Rebuild the index in the background |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Errors use the shape `{ "error": { "code": "...", "message": "..." } }`.

use crate::commands::{cmd_ask, cmd_ingest, AskOptions, AskResponse, IngestOutcome};
use crate::pipeline::Pipeline;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared state handed to every handler
pub type AppState = Arc<Pipeline>;

/// Build the router with all routes and a permissive CORS layer
pub fn router(pipeline: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask).get(handle_ask_usage))
        .route("/ingest", post(handle_ingest))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(pipeline)
}

/// Bind to `[server].bind` and serve until the process is stopped.
pub async fn run_server(pipeline: AppState) -> crate::error::Result<()> {
    let bind_addr = pipeline.config.server.bind.clone();
    let app = router(pipeline);

    info!("Listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ /ask ============

#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn handle_ask(
    State(pipeline): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let options = AskOptions {
        k: request.k,
        debug: request.debug,
    };
    match cmd_ask(&pipeline, &request.question, options).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Request failed: {}", e);
            Err(internal(e.to_string()))
        }
    }
}

async fn handle_ask_usage() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Send a POST request with JSON {\"question\": \"...\"} to ask a question."
            .to_string(),
    })
}

// ============ POST /ingest ============

async fn handle_ingest(State(pipeline): State<AppState>) -> Json<MessageResponse> {
    tokio::spawn(async move {
        match cmd_ingest(&pipeline).await {
            Ok(IngestOutcome::Success { chunks_count, .. }) => {
                info!("Background ingestion finished with {} chunks", chunks_count)
            }
            Ok(IngestOutcome::Error { message }) => {
                error!("Background ingestion failed: {}", message)
            }
            Err(e) => error!("Background ingestion failed: {}", e),
        }
    });

    Json(MessageResponse {
        message: "Ingestion started in background".to_string(),
    })
}

// ============ GET /health ============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::REFUSAL;
    use crate::testing::{failing_pipeline_in, pipeline_in, write_doc};
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_health() {
        let Json(health) = handle_health().await;
        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_ask_usage() {
        let Json(usage) = handle_ask_usage().await;
        assert!(usage.message.contains("POST"));
    }

    #[tokio::test]
    async fn test_ask_without_index_refuses() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(tmp.path(), "Answer: 61 knots.\nCitations: POH, Page 4");

        let request = AskRequest {
            question: "What is Vso?".to_string(),
            debug: false,
            k: None,
        };
        let Json(response) = handle_ask(State(Arc::new(pipeline)), Json(request))
            .await
            .unwrap();
        assert_eq!(response.answer, REFUSAL);
        assert!(response.citations.is_empty());
        assert!(response.retrieved_chunks.is_none());
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, llm) = pipeline_in(tmp.path(), "unused");
        let request = AskRequest {
            question: "   ".to_string(),
            debug: false,
            k: None,
        };
        let err = handle_ask(State(Arc::new(pipeline)), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_ask_model_failure_is_an_answer() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = failing_pipeline_in(tmp.path());
        write_doc(
            tmp.path(),
            "doc.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );
        cmd_ingest(&pipeline).await.unwrap();

        let request = AskRequest {
            question: "What is Vso?".to_string(),
            debug: true,
            k: Some(1),
        };
        let Json(response) = handle_ask(State(Arc::new(pipeline)), Json(request))
            .await
            .unwrap();
        assert!(response.answer.starts_with("Error communicating with LLM"));
        assert_eq!(response.retrieved_chunks.map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn test_background_ingest_swaps_index() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(tmp.path(), "unused");
        write_doc(
            tmp.path(),
            "doc.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );
        let pipeline = Arc::new(pipeline);

        let Json(ack) = handle_ingest(State(pipeline.clone())).await;
        assert_eq!(ack.message, "Ingestion started in background");

        let mut hits = Vec::new();
        for _ in 0..100 {
            hits = pipeline.retriever.retrieve("stall speed", 5).await.unwrap();
            if !hits.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_ask_request_defaults() {
        let request: AskRequest = serde_json::from_str(r#"{"question": "What is Vso?"}"#).unwrap();
        assert!(!request.debug);
        assert_eq!(request.k, None);
    }
}
