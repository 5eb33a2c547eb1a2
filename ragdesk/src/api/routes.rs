//! API routes for the ragdesk server

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::error::RagError;
use crate::pipeline::{AnswerPipeline, StreamEvent};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Application state
pub struct AppState {
    pub pipeline: Arc<AnswerPipeline>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of `/query` and `/ask`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    /// Accepted in place of `query`
    pub question: Option<String>,
    #[serde(alias = "namespace")]
    pub partition: Option<String>,
    pub top_k: Option<usize>,
    #[serde(default)]
    pub include_sources: bool,
    #[serde(default = "default_as_text")]
    pub as_text: bool,
}

fn default_as_text() -> bool {
    true
}

impl QueryRequest {
    /// The question text, from `query` or else `question`
    pub fn text(&self) -> Result<&str, ApiError> {
        [self.query.as_deref(), self.question.as_deref()]
            .into_iter()
            .flatten()
            .find(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError(RagError::Validation("Field 'query' is required.".to_string())))
    }
}

/// Error body, shaped like `{"detail": "..."}`
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Maps pipeline failures onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            RagError::Retrieval(_) | RagError::Generation(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Query error: {}", self.0);
        }

        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Buffered answer; JSON with sources only when asked for and not as text
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let text = request.text()?;
    let answer = state
        .pipeline
        .query(text, request.partition.as_deref(), request.top_k)
        .await?;

    if request.include_sources && !request.as_text {
        return Ok(Json(answer).into_response());
    }

    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], answer.answer).into_response())
}

/// Streamed answer; the body carries only the generated text
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let text = request.text()?;
    let events = state
        .pipeline
        .query_stream(text, request.partition.as_deref(), request.top_k)
        .await?;

    let tokens = events.filter_map(|event| async move {
        match event {
            Ok(StreamEvent::Token { text }) => Some(Ok(text)),
            Ok(_) => None,
            // Aborts the response mid-body
            Err(e) => Some(Err(e)),
        }
    });

    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(tokens)).into_response())
}
