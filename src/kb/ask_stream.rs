//! Folding of the combined ask endpoint's NDJSON stream.
//!
//! Each line is `{"item": {"type": ..., ...}}`. The fold produces the same
//! object the endpoint returns in synchronous mode, so one normalizer serves
//! both modes.

use serde_json::{json, Map, Value};

use crate::core::errors::{truncate_detail, ApiError};

#[derive(Debug, Default)]
pub struct AskStreamFolder {
    answer: String,
    retrieval: Option<Value>,
    retrieval_results: Option<Value>,
    metadata: Option<Value>,
    citations: Option<Value>,
    relations: Option<Value>,
    status: Option<Value>,
    buffer: Vec<u8>,
}

impl AskStreamFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes; complete lines are consumed, a partial tail is kept.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), ApiError> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&String::from_utf8_lossy(&line))?;
        }
        Ok(())
    }

    pub fn push_line(&mut self, line: &str) -> Result<(), ApiError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let Ok(parsed) = serde_json::from_str::<Value>(line) else {
            tracing::debug!("Skipping undecodable ask stream line");
            return Ok(());
        };
        let item = parsed.get("item").unwrap_or(&parsed);
        let kind = item.get("type").and_then(|v| v.as_str()).unwrap_or_default();

        match kind {
            "answer" => {
                if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
                    self.answer.push_str(text);
                }
            }
            "retrieval" => {
                if let Some(results) = item.get("results") {
                    self.retrieval_results = Some(results.clone());
                    self.retrieval = Some(json!({ "results": results.clone() }));
                }
            }
            "metadata" => self.metadata = Some(strip_type(item)),
            "citations" => {
                let citations = item.get("citations").cloned();
                self.citations = Some(citations.unwrap_or_else(|| strip_type(item)));
            }
            "relations" => {
                let relations = item.get("relations").cloned();
                self.relations = Some(relations.unwrap_or_else(|| strip_type(item)));
            }
            "status" => self.status = Some(strip_type(item)),
            "error" => {
                let detail = item
                    .get("error")
                    .map(|e| match e.as_str() {
                        Some(text) => text.to_string(),
                        None => e.to_string(),
                    })
                    .unwrap_or_else(|| "unknown stream error".to_string());
                return Err(ApiError::UpstreamAsk {
                    status: 502,
                    detail: truncate_detail(&detail),
                });
            }
            other => tracing::debug!("Ignoring ask stream item of type '{}'", other),
        }
        Ok(())
    }

    /// Flushes any partial line and returns the synchronous-shaped response.
    pub fn finish(mut self) -> Result<Value, ApiError> {
        let rest = std::mem::take(&mut self.buffer);
        self.push_line(&String::from_utf8_lossy(&rest))?;

        let mut response = Map::new();
        response.insert("answer".to_string(), Value::String(self.answer));
        if let Some(retrieval) = self.retrieval {
            response.insert("retrieval".to_string(), retrieval);
        }
        if let Some(results) = self.retrieval_results {
            if results.is_object() {
                response.insert("retrieval_results".to_string(), results);
            }
        }
        if let Some(metadata) = self.metadata {
            response.insert("metadata".to_string(), metadata);
        }
        if let Some(citations) = self.citations {
            response.insert("citations".to_string(), citations);
        }
        if let Some(relations) = self.relations {
            response.insert("relations".to_string(), relations);
        }
        if let Some(status) = self.status {
            response.insert("status".to_string(), status);
        }
        Ok(Value::Object(response))
    }
}

fn strip_type(item: &Value) -> Value {
    match item.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "type")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => item.clone(),
    }
}
