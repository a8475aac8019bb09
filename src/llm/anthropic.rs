use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::ChatRequest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client: Client::new(),
        }
    }
}

/// Concatenates every `text` segment of a Messages API response, in order.
pub fn collect_text_segments(payload: &Value) -> String {
    payload
        .get("content")
        .and_then(|c| c.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "max_tokens": request.max_tokens.unwrap_or(1024),
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(s) = request.system { obj.insert("system".to_string(), json!(s)); }
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
        }

        let res = self.client.post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::generation)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Generation(format!(
                "Anthropic API error ({}): {}",
                status,
                crate::core::errors::truncate_detail(&text)
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::generation)?;
        Ok(collect_text_segments(&payload))
    }
}
