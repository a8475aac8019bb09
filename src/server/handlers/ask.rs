use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::json_body;
use crate::core::errors::ApiError;
use crate::server::schemas::AskBody;
use crate::state::AppState;

pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let params = body.validate()?;

    let result = state.pipeline.ask(&body.query, &params).await?;

    Ok(Json(json!({
        "answer": result.answer,
        "sources": result.sources,
        "model": state.pipeline.model(),
        "nuclia_kb": state.kb.kb_id(),
        "params": params,
    })))
}
