use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{AppConfig, ConfigService};
use crate::kb::{KnowledgeBox, NucliaClient};
use crate::llm::{AnthropicProvider, LlmService};
use crate::rag::AskPipeline;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Holds the immutable configuration and the two upstream clients. Nothing
/// here is mutated after startup.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub kb: Arc<dyn KnowledgeBox>,
    pub pipeline: AskPipeline,
}

impl AppState {
    /// Loads configuration and builds the knowledge base and LLM clients.
    pub fn initialize(config_service: &ConfigService) -> Result<Arc<Self>, InitializationError> {
        let config = Arc::new(
            config_service
                .load_config()
                .map_err(InitializationError::Config)?,
        );

        let kb = Arc::new(
            NucliaClient::new(Arc::new(config.nuclia.clone()))
                .map_err(InitializationError::KnowledgeBase)?,
        );

        let llm_config = Arc::new(config.llm.clone());
        let provider = Arc::new(AnthropicProvider::new(
            llm_config.base_url.clone(),
            llm_config.api_key.clone(),
            Duration::from_secs(llm_config.timeout_secs),
        ));
        let llm = LlmService::new(provider, llm_config);

        Ok(Self::from_parts(config, kb, llm))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        kb: Arc<dyn KnowledgeBox>,
        llm: LlmService,
    ) -> Arc<Self> {
        let pipeline = AskPipeline::new(
            kb.clone(),
            llm,
            config.nuclia.download_url_ttl_secs,
            config.nuclia.internal_domains.clone(),
        );
        Arc::new(AppState {
            config,
            kb,
            pipeline,
        })
    }
}
