//! Prompt context assembly.
//!
//! Takes the hits in the order the search service returned them, keeps the
//! first `max_chunks`, drops low-score and blank ones, and joins the rest
//! with a visible separator. No re-ranking happens here.

use crate::kb::{SearchHit, SearchResults};

/// Separator placed between context blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Configuration for context building.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilderConfig {
    /// Size of the hit window, counted before filtering.
    pub max_chunks: usize,
    /// Hits scoring strictly below this are dropped.
    pub score_threshold: f64,
    /// Prefix each block with a `[Document: ...]` / `[Source: ...]` header.
    pub include_metadata: bool,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_chunks: 20,
            score_threshold: 0.0,
            include_metadata: true,
        }
    }
}

/// Hits inside the first `max_chunks` window that pass the score and
/// non-blank text filter. `missing_score` stands in for unscored hits.
pub(crate) fn windowed_hits(
    hits: &[SearchHit],
    max_chunks: usize,
    score_threshold: f64,
    missing_score: f64,
) -> impl Iterator<Item = &SearchHit> {
    hits.iter().take(max_chunks).filter(move |hit| {
        hit.score.unwrap_or(missing_score) >= score_threshold && !hit.text.trim().is_empty()
    })
}

/// Builds the context string fed to the answer generator.
///
/// Returns an empty string when nothing survives filtering.
pub fn build_context(results: &SearchResults, config: &ContextBuilderConfig) -> String {
    // unscored hits are trusted here
    let window = windowed_hits(&results.hits, config.max_chunks, config.score_threshold, 1.0);
    let blocks: Vec<String> = window
        .map(|hit| {
            let text = hit.text.trim();
            if !config.include_metadata {
                return text.to_string();
            }
            match block_header(results, hit) {
                Some(header) => format!("[{}]\n{}", header, text),
                None => text.to_string(),
            }
        })
        .collect();

    blocks.join(BLOCK_SEPARATOR)
}

fn block_header(results: &SearchResults, hit: &SearchHit) -> Option<String> {
    let title = results.title_of(hit);

    let mut parts = Vec::new();
    if let Some(title) = title {
        parts.push(format!("Document: {}", title));
    } else if !hit.field.is_empty() {
        parts.push(format!("Source: {}", hit.field));
    }
    if let Some(page) = hit.page.filter(|p| *p > 0) {
        parts.push(format!("(page {})", page));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
