//! UI-facing citation entries derived from a search payload.
//!
//! Each surviving hit becomes a [`SourceEntry`]. File resources get a
//! temporary download descriptor from an authoritative resource lookup,
//! link resources get their original URL, and anything else falls back to
//! the resource's location inside the knowledge base. Lookup failures never
//! abort extraction: the entry is kept, just without a download.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::context_builder::windowed_hits;
use crate::kb::{
    KnowledgeBox, ResourceDetails, ResourceKind, SearchHit, SearchPayload, SearchResults,
};

pub const UNTITLED: &str = "Untitled document";

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub max_chunks: usize,
    pub score_threshold: f64,
    pub download_ttl_secs: u64,
    /// Host fragments that mark a URL as belonging to the knowledge-base provider.
    pub internal_domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    None,
    Nuclia,
    External,
    Resource,
}

/// Temporary download descriptor for one file field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDownload {
    pub download_url: String,
    pub content_type: String,
    pub size: u64,
    pub filename: String,
    pub file_id: String,
    pub is_pdf: bool,
    pub is_excel: bool,
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceEntry {
    pub id: usize,
    pub title: String,
    pub text: String,
    pub score: Option<f64>,
    pub page: Option<u64>,
    pub field: String,
    pub resource_id: String,
    pub url: String,
    pub url_type: UrlType,
    pub resource_type: String,
    pub has_url: bool,
    pub is_downloadable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDownload>,
}

/// Parses `raw` into its canonical shape and extracts source entries from it.
pub async fn extract_sources(
    kb: &dyn KnowledgeBox,
    raw: &Value,
    options: &SourceOptions,
) -> Vec<SourceEntry> {
    let payload = SearchPayload::parse(raw);
    debug!("Extracting sources from {} payload", payload.shape());
    extract_from_results(kb, &payload.into_results(), options).await
}

/// Builds one entry per surviving hit, numbered from 1 in payload order.
pub async fn extract_from_results(
    kb: &dyn KnowledgeBox,
    results: &SearchResults,
    options: &SourceOptions,
) -> Vec<SourceEntry> {
    // per-call memo; a failed lookup is remembered as None
    let mut lookups: HashMap<String, Option<ResourceDetails>> = HashMap::new();
    let mut entries = Vec::new();

    // unscored hits count as 0.0 here
    let hits: Vec<&SearchHit> =
        windowed_hits(&results.hits, options.max_chunks, options.score_threshold, 0.0).collect();

    for hit in hits {
        let meta = results.resource(&hit.resource_id).cloned().unwrap_or_default();
        let title = results.title_of(hit).unwrap_or(UNTITLED).to_string();

        let mut url = String::new();
        let mut file = None;

        match meta.kind() {
            ResourceKind::File if !hit.resource_id.is_empty() => {
                file = resolve_file(kb, &hit.resource_id, &title, options, &mut lookups).await;
                if let Some(descriptor) = &file {
                    url = descriptor.download_url.clone();
                }
            }
            ResourceKind::Link => {
                url = meta
                    .origin_url
                    .clone()
                    .or_else(|| meta.metadata_url.clone())
                    .unwrap_or_default();
            }
            _ => {}
        }

        if url.is_empty() && !hit.resource_id.is_empty() {
            url = kb.resource_url(&hit.resource_id);
        }

        let score = hit.score.unwrap_or(0.0);
        entries.push(SourceEntry {
            id: entries.len() + 1,
            title,
            text: hit.text.trim().to_string(),
            score: (score != 0.0).then(|| round3(score)),
            page: hit.page,
            field: hit.field.clone(),
            resource_id: hit.resource_id.clone(),
            url_type: classify_url(&url, &options.internal_domains),
            has_url: !url.is_empty(),
            url,
            resource_type: meta.icon.clone().unwrap_or_else(|| "unknown".to_string()),
            is_downloadable: file.is_some(),
            file,
        });
    }

    entries
}

async fn resolve_file(
    kb: &dyn KnowledgeBox,
    resource_id: &str,
    title: &str,
    options: &SourceOptions,
    lookups: &mut HashMap<String, Option<ResourceDetails>>,
) -> Option<FileDownload> {
    if !lookups.contains_key(resource_id) {
        debug!(resource_id, "Looking up file resource");
        let details = match kb.resource(resource_id).await {
            Ok(details) => Some(details),
            Err(err) => {
                warn!(
                    resource_id,
                    error = %err,
                    "Resource lookup failed; source is not downloadable"
                );
                None
            }
        };
        lookups.insert(resource_id.to_string(), details);
    }

    let details = lookups.get(resource_id)?.as_ref()?;
    let field = details.first_typed_file()?;

    let download_url = match kb
        .temporal_download_url(resource_id, &field.id, options.download_ttl_secs)
        .await
    {
        Ok(url) => url,
        Err(err) => {
            warn!(
                resource_id,
                file_id = %field.id,
                error = %err,
                "Temporary download URL failed; source is not downloadable"
            );
            return None;
        }
    };

    let lowered = field.content_type.to_lowercase();
    Some(FileDownload {
        download_url,
        content_type: field.content_type.clone(),
        size: field.size,
        filename: field.filename.clone().unwrap_or_else(|| title.to_string()),
        file_id: field.id.clone(),
        is_pdf: lowered.contains("pdf"),
        is_excel: lowered.contains("sheet") || lowered.contains("excel"),
        ttl: options.download_ttl_secs,
    })
}

/// Classifies a resolved source URL.
pub fn classify_url(url: &str, internal_domains: &[String]) -> UrlType {
    if url.is_empty() {
        UrlType::None
    } else if url.contains("http://") || url.contains("https://") {
        if internal_domains.iter().any(|d| url.contains(d.as_str())) {
            UrlType::Nuclia
        } else {
            UrlType::External
        }
    } else {
        UrlType::Resource
    }
}

fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}
