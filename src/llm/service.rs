use std::sync::Arc;

use crate::core::config::LlmConfig;
use crate::core::errors::ApiError;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest};

/// Answer generation over a configured provider, model and system instruction.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    config: Arc<LlmConfig>,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, config: Arc<LlmConfig>) -> Self {
        Self { provider, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Single completion call for `question` grounded on `context`.
    ///
    /// An empty context is valid; the model is still called.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, ApiError> {
        let message = ChatMessage::user(build_user_message(question, context));
        let request = ChatRequest::new(vec![message])
            .with_system(self.config.instructions.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            context_chars = context.len(),
            "Generating answer"
        );

        self.provider
            .chat(request, &self.config.model)
            .await
            .map_err(|err| match err {
                ApiError::Generation(msg) => ApiError::Generation(msg),
                other => ApiError::generation(other),
            })
    }
}

fn build_user_message(question: &str, context: &str) -> String {
    format!("Question: {}\n\nContext:\n{}", question, context)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records requests and replies with a fixed answer.
    pub(crate) struct RecordingProvider {
        pub reply: Result<String, String>,
        pub seen: Mutex<Vec<(ChatRequest, String)>>,
    }

    impl RecordingProvider {
        pub(crate) fn answering(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push((request, model_id.to_string()));
            self.reply.clone().map_err(ApiError::Internal)
        }
    }

    pub(crate) fn test_llm_config() -> LlmConfig {
        LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "sk-test".to_string(),
            model: "claude-test".to_string(),
            max_tokens: 800,
            temperature: 0.2,
            instructions: "Answer from the context.".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn answer_uses_fixed_instruction_and_budget() {
        let provider = Arc::new(RecordingProvider::answering("42"));
        let service = LlmService::new(provider.clone(), Arc::new(test_llm_config()));

        let answer = service.answer("What?", "[Document: A]\ntext").await.unwrap();
        assert_eq!(answer, "42");

        let seen = provider.seen.lock().unwrap();
        let (request, model) = &seen[0];
        assert_eq!(model, "claude-test");
        assert_eq!(request.system.as_deref(), Some("Answer from the context."));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(800));
        assert_eq!(
            request.messages[0].content,
            "Question: What?\n\nContext:\n[Document: A]\ntext"
        );
    }

    #[tokio::test]
    async fn empty_context_is_still_sent() {
        let provider = Arc::new(RecordingProvider::answering("I don't know."));
        let service = LlmService::new(provider.clone(), Arc::new(test_llm_config()));

        assert_eq!(service.answer("Q?", "").await.unwrap(), "I don't know.");
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provider_failures_become_generation_errors() {
        let provider = Arc::new(RecordingProvider::failing("connection reset"));
        let service = LlmService::new(provider, Arc::new(test_llm_config()));

        let err = service.answer("Q?", "ctx").await.unwrap_err();
        assert!(matches!(err, ApiError::Generation(_)));
    }
}
