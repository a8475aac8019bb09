use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::json_body;
use crate::core::errors::ApiError;
use crate::rag::normalize_ask_response;
use crate::server::schemas::NucliaAskBody;
use crate::state::AppState;

/// Delegates retrieval and generation to the knowledge base's own ask endpoint.
pub async fn nuclia_ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NucliaAskBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let request = body.to_request()?;

    let raw_response = state.kb.ask(&request).await?;
    let normalized = normalize_ask_response(&raw_response);
    tracing::info!(
        sources = normalized.sources.len(),
        synchronous = request.synchronous,
        "Combined ask answered"
    );

    Ok(Json(json!({
        "answer": normalized.answer,
        "sources": normalized.sources,
        "metadata": normalized.metadata,
        "citations": normalized.citations,
        "relations": normalized.relations,
        "nuclia_kb": state.kb.kb_id(),
        "params": {
            "rephrase": body.rephrase(),
            "citations": body.citations,
            "synchronous": body.synchronous(),
            "features": body.features,
        },
        "raw_response": raw_response,
    })))
}
