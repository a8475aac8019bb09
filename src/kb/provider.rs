use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::types::{DownloadedFile, ResourceDetails};
use crate::core::errors::ApiError;

/// Retrieval modes understood by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFeature {
    Keyword,
    Semantic,
    Relations,
}

impl SearchFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFeature::Keyword => "keyword",
            SearchFeature::Semantic => "semantic",
            SearchFeature::Relations => "relations",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub size: u32,
    pub features: Vec<SearchFeature>,
    pub filters: Vec<String>,
    pub faceted: Vec<String>,
    pub sort: Option<String>,
    pub min_score: Option<f64>,
    /// Overrides the configured vector set for semantic search.
    pub vectorset: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, size: u32) -> Self {
        Self {
            query: query.into(),
            size,
            features: vec![SearchFeature::Keyword, SearchFeature::Semantic],
            filters: Vec::new(),
            faceted: Vec::new(),
            sort: None,
            min_score: None,
            vectorset: None,
        }
    }

    pub fn with_features(mut self, features: Vec<SearchFeature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn uses_semantic(&self) -> bool {
        self.features.contains(&SearchFeature::Semantic)
    }
}

/// One turn of conversational history for the combined ask endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMessage {
    pub author: String,
    pub text: String,
}

/// Prompt overrides for the combined ask endpoint. Empty members are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rephrase: Option<String>,
}

impl PromptOverride {
    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.user.is_none() && self.rephrase.is_none()
    }
}

/// Request body for the combined retrieval + generation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rephrase: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptOverride>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sent as a header, not in the body.
    #[serde(skip)]
    pub synchronous: bool,
}

/// Operations against the managed knowledge base.
#[async_trait]
pub trait KnowledgeBox: Send + Sync {
    /// Knowledge base identifier.
    fn kb_id(&self) -> &str;

    /// Canonical URL of a resource inside the knowledge base.
    fn resource_url(&self, resource_id: &str) -> String;

    /// Hybrid search. Returns the raw payload.
    async fn search(&self, request: &SearchRequest) -> Result<Value, ApiError>;

    /// Authoritative resource lookup including file fields.
    async fn resource(&self, resource_id: &str) -> Result<ResourceDetails, ApiError>;

    /// Issues a time-limited, credential-free URL for one file field.
    async fn temporal_download_url(
        &self,
        resource_id: &str,
        file_id: &str,
        ttl_secs: u64,
    ) -> Result<String, ApiError>;

    /// Combined retrieval + generation. Always returns the synchronous response shape.
    async fn ask(&self, request: &AskRequest) -> Result<Value, ApiError>;

    /// Fetches the bytes of a file field.
    async fn download_file(
        &self,
        resource_id: &str,
        file_id: &str,
    ) -> Result<DownloadedFile, ApiError>;
}
