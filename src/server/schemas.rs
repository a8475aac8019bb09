//! Request bodies for the ask routes and their validation.

use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::kb::{AskRequest, ContextMessage, PromptOverride};
use crate::rag::AskParams;

const QUERY_MIN_CHARS: usize = 2;
const QUERY_MAX_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct AskBody {
    pub query: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub max_chunks: Option<i64>,
    #[serde(default)]
    pub use_semantic: Option<bool>,
    #[serde(default)]
    pub min_score: Option<f64>,
}

impl AskBody {
    /// Checks field ranges and fills in defaults.
    pub fn validate(&self) -> Result<AskParams, ApiError> {
        validate_query(&self.query)?;
        let defaults = AskParams::default();

        let size = check_range("size", self.size, 1, 100)?.unwrap_or(defaults.size as i64);
        let max_chunks = check_range("max_chunks", self.max_chunks, 1, 50)?
            .unwrap_or(defaults.max_chunks as i64);

        let min_score = match self.min_score {
            Some(score) if !(0.0..=1.0).contains(&score) => {
                return Err(ApiError::BadRequest(
                    "min_score must be between 0.0 and 1.0".to_string(),
                ))
            }
            Some(score) => score,
            None => defaults.min_score,
        };

        Ok(AskParams {
            size: size as u32,
            max_chunks: max_chunks as usize,
            use_semantic: self.use_semantic.unwrap_or(defaults.use_semantic),
            min_score,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationEntry {
    pub author: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptBody {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub rephrase: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NucliaAskBody {
    pub query: String,
    #[serde(default)]
    pub context: Option<Vec<ConversationEntry>>,
    #[serde(default)]
    pub rephrase: Option<bool>,
    #[serde(default)]
    pub citations: Option<String>,
    #[serde(default)]
    pub filters: Option<Vec<String>>,
    #[serde(default)]
    pub prompt: Option<PromptBody>,
    #[serde(default)]
    pub synchronous: Option<bool>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

impl NucliaAskBody {
    pub fn rephrase(&self) -> bool {
        self.rephrase.unwrap_or(false)
    }

    pub fn synchronous(&self) -> bool {
        self.synchronous.unwrap_or(true)
    }

    /// Validates the body and builds the combined ask request.
    pub fn to_request(&self) -> Result<AskRequest, ApiError> {
        validate_query(&self.query)?;
        let max_tokens = check_range("max_tokens", self.max_tokens, 1, 4096)?;

        let context = self
            .context
            .iter()
            .flatten()
            .enumerate()
            .map(|(idx, entry)| {
                if entry.author.trim().is_empty() || entry.text.trim().is_empty() {
                    return Err(ApiError::BadRequest(format!(
                        "context[{}] requires a non-empty author and text",
                        idx
                    )));
                }
                Ok(ContextMessage {
                    author: entry.author.clone(),
                    text: entry.text.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prompt = self.prompt.as_ref().map(|p| PromptOverride {
            system: non_empty(&p.system),
            user: non_empty(&p.user),
            rephrase: non_empty(&p.rephrase),
        });

        Ok(AskRequest {
            query: self.query.clone(),
            context,
            rephrase: self.rephrase(),
            citations: non_empty(&self.citations),
            filters: self.filters.clone().unwrap_or_default(),
            prompt: prompt.filter(|p| !p.is_empty()),
            features: self.features.clone().unwrap_or_default(),
            max_tokens: max_tokens.map(|t| t as u32),
            synchronous: self.synchronous(),
        })
    }
}

fn validate_query(query: &str) -> Result<(), ApiError> {
    let chars = query.chars().count();
    if !(QUERY_MIN_CHARS..=QUERY_MAX_CHARS).contains(&chars) {
        return Err(ApiError::BadRequest(format!(
            "query must be between {} and {} characters",
            QUERY_MIN_CHARS, QUERY_MAX_CHARS
        )));
    }
    Ok(())
}

fn check_range(
    field: &str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Result<Option<i64>, ApiError> {
    match value {
        Some(v) if v < min || v > max => Err(ApiError::BadRequest(format!(
            "{} must be between {} and {}",
            field, min, max
        ))),
        other => Ok(other),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
