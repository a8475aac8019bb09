//! Normalization of the combined ask endpoint's response.

use serde::Serialize;
use serde_json::{json, Value};

use crate::kb::SearchResults;
use super::sources::UNTITLED;

/// A citation as listed by the combined ask endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskSource {
    pub id: usize,
    pub text: String,
    pub score: Option<f64>,
    pub resource_id: String,
    pub field: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedAsk {
    pub answer: String,
    pub sources: Vec<AskSource>,
    pub metadata: Value,
    pub citations: Value,
    pub relations: Value,
}

/// Reshapes a synchronous-mode ask response into `{answer, sources, metadata,
/// citations, relations}`. Sources are numbered in the order the provider
/// lists them under `retrieval.results`.
pub fn normalize_ask_response(response: &Value) -> NormalizedAsk {
    let answer = response
        .get("answer")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let results = response
        .get("retrieval")
        .and_then(|r| r.get("results"))
        .map(|results| match results.as_array() {
            Some(items) => SearchResults::from_hit_list(items),
            None => SearchResults::from_find_shape(results),
        })
        .unwrap_or_default();

    let sources = results
        .hits
        .iter()
        .enumerate()
        .map(|(idx, hit)| AskSource {
            id: idx + 1,
            text: hit.text.clone(),
            score: hit.score,
            resource_id: hit.resource_id.clone(),
            field: hit.field.clone(),
            title: results.title_of(hit).unwrap_or(UNTITLED).to_string(),
        })
        .collect();

    NormalizedAsk {
        answer,
        sources,
        metadata: section(response, "metadata", json!({})),
        citations: section(response, "citations", json!({})),
        relations: section(response, "relations", json!([])),
    }
}

fn section(response: &Value, key: &str, default: Value) -> Value {
    match response.get(key) {
        Some(value) if !value.is_null() => value.clone(),
        _ => default,
    }
}
