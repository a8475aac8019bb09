pub mod ask;
pub mod download;
pub mod health;
pub mod nuclia_ask;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::core::errors::ApiError;

/// Unwraps a JSON body, turning decode failures into 400s.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
