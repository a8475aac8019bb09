//! The `/ask` flow: preprocess, search, build context, generate, extract sources.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::errors::ApiError;
use crate::kb::{KnowledgeBox, SearchFeature, SearchPayload, SearchRequest};
use crate::llm::LlmService;
use super::context_builder::{build_context, ContextBuilderConfig};
use super::query::preprocess_query;
use super::sources::{extract_from_results, SourceEntry, SourceOptions};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AskParams {
    pub size: u32,
    pub max_chunks: usize,
    pub use_semantic: bool,
    pub min_score: f64,
}

impl Default for AskParams {
    fn default() -> Self {
        Self {
            size: 30,
            max_chunks: 20,
            use_semantic: true,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub answer: String,
    pub sources: Vec<SourceEntry>,
    /// Untransformed search payload.
    pub search_results: Value,
}

pub struct AskPipeline {
    kb: Arc<dyn KnowledgeBox>,
    llm: LlmService,
    download_ttl_secs: u64,
    internal_domains: Vec<String>,
}

impl AskPipeline {
    pub fn new(
        kb: Arc<dyn KnowledgeBox>,
        llm: LlmService,
        download_ttl_secs: u64,
        internal_domains: Vec<String>,
    ) -> Self {
        Self {
            kb,
            llm,
            download_ttl_secs,
            internal_domains,
        }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Runs one question through search and generation.
    ///
    /// Search failures surface as `UpstreamSearch`, generation failures as
    /// `Generation`. Source extraction never fails the request.
    pub async fn ask(&self, question: &str, params: &AskParams) -> Result<AskResult, ApiError> {
        let query = preprocess_query(question);

        let mut features = vec![SearchFeature::Keyword];
        if params.use_semantic {
            features.push(SearchFeature::Semantic);
        }
        let request = SearchRequest::new(query, params.size)
            .with_features(features)
            .with_min_score(params.min_score);

        debug!(size = params.size, semantic = params.use_semantic, "Searching knowledge base");
        let search_results = self.kb.search(&request).await?;
        let results = SearchPayload::parse(&search_results).into_results();

        let context = build_context(
            &results,
            &ContextBuilderConfig {
                max_chunks: params.max_chunks,
                score_threshold: params.min_score,
                include_metadata: true,
            },
        );

        // generation sees the question as the user typed it
        let answer = self.llm.answer(question, &context).await?;

        let options = SourceOptions {
            max_chunks: params.max_chunks,
            score_threshold: params.min_score,
            download_ttl_secs: self.download_ttl_secs,
            internal_domains: self.internal_domains.clone(),
        };
        let sources = extract_from_results(self.kb.as_ref(), &results, &options).await;

        info!(
            hits = results.hits.len(),
            context_chars = context.len(),
            sources = sources.len(),
            "Answered question"
        );

        Ok(AskResult {
            answer,
            sources,
            search_results,
        })
    }
}
