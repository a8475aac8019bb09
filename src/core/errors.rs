use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Maximum number of characters of an upstream body echoed back to callers.
pub const UPSTREAM_DETAIL_LIMIT: usize = 600;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("knowledge base search failed ({status}): {detail}")]
    UpstreamSearch { status: u16, detail: String },
    #[error("knowledge base ask failed ({status}): {detail}")]
    UpstreamAsk { status: u16, detail: String },
    #[error("LLM call failed: {0}")]
    Generation(String),
    #[error("file download failed")]
    Download,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Generation(err.to_string())
    }
}

pub fn truncate_detail(body: &str) -> String {
    body.chars().take(UPSTREAM_DETAIL_LIMIT).collect()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::UpstreamSearch { status, detail } => (
                StatusCode::BAD_GATEWAY,
                format!("Knowledge base search failed ({}): {}", status, detail),
            ),
            ApiError::UpstreamAsk { status, detail } => {
                let code = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|code| code.is_client_error() || code.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    code,
                    format!("Knowledge base ask failed ({}): {}", status, detail),
                )
            }
            ApiError::Generation(msg) => {
                (StatusCode::BAD_GATEWAY, format!("LLM call failed: {}", msg))
            }
            ApiError::Download => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error downloading file".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
