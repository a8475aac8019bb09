use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures_util::stream;

use crate::core::errors::ApiError;
use crate::state::AppState;

const CHUNK_SIZE: usize = 8192;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Re-streams a file fetched server-side so the service credential stays here.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path((resource_id, file_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file = state
        .kb
        .download_file(&resource_id, &file_id)
        .await
        .map_err(|err| {
            tracing::error!(
                resource_id = %resource_id,
                file_id = %file_id,
                error = %err,
                "File download failed"
            );
            ApiError::Download
        })?;

    let content_type = file
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let disposition = attachment_disposition(&resource_id, &file_id, &content_type);
    let length = file.content.len();

    let mut response = Body::from_stream(stream::iter(
        chunks(file.content).into_iter().map(Ok::<_, Infallible>),
    ))
    .into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|_| ApiError::Download)?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}

fn chunks(content: Bytes) -> Vec<Bytes> {
    (0..content.len())
        .step_by(CHUNK_SIZE)
        .map(|start| content.slice(start..(start + CHUNK_SIZE).min(content.len())))
        .collect()
}

/// File extension implied by a content type, empty when unknown.
pub fn extension_for(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("pdf") {
        ".pdf"
    } else if ct.contains("spreadsheetml") {
        ".xlsx"
    } else if ct.contains("ms-excel") {
        ".xls"
    } else if ct.contains("csv") {
        ".csv"
    } else if ct.contains("wordprocessingml") {
        ".docx"
    } else {
        ""
    }
}

/// `attachment` disposition named `{resource_id}_{file_id}{ext}`. Ids are
/// percent-encoded so the header stays visible ASCII.
fn attachment_disposition(resource_id: &str, file_id: &str, content_type: &str) -> String {
    format!(
        "attachment; filename=\"{}_{}{}\"",
        urlencoding::encode(resource_id),
        urlencoding::encode(file_id),
        extension_for(content_type)
    )
}
