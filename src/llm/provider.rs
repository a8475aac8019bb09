use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::ChatRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "anthropic")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); text segments are concatenated in order
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;
}
