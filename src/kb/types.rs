//! Canonical shapes for knowledge-base search payloads.
//!
//! The service answers with loosely-typed JSON in several layouts. Everything
//! is parsed here, once, into [`SearchResults`]; downstream code never probes
//! raw JSON.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Icon value the knowledge base uses for link resources.
pub const LINK_ICON: &str = "application/stf-link";

/// One retrieved paragraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub resource_id: String,
    pub field: String,
    pub text: String,
    /// `None` when the provider did not report a score.
    pub score: Option<f64>,
    pub page: Option<u64>,
    /// Title carried by the hit itself, as in combined-ask retrieval lists.
    pub title: Option<String>,
}

impl SearchHit {
    pub fn from_value(value: &Value) -> Self {
        Self {
            resource_id: str_field(value, "rid"),
            field: str_field(value, "field"),
            text: str_field(value, "text"),
            score: value.get("score").and_then(|v| v.as_f64()),
            page: value
                .get("position")
                .and_then(|p| p.get("page_number"))
                .and_then(|v| v.as_u64()),
            title: non_empty(value.get("title")),
        }
    }
}

/// Descriptive data for a resource as embedded in a search payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceMetadata {
    pub title: Option<String>,
    pub icon: Option<String>,
    /// First non-empty of `origin.url`, `origin.path`.
    pub origin_url: Option<String>,
    /// First non-empty of `metadata.uri`, `metadata.url`.
    pub metadata_url: Option<String>,
}

impl ResourceMetadata {
    pub fn from_value(value: &Value) -> Self {
        let origin = value.get("origin").filter(|v| v.is_object());
        let metadata = value.get("metadata").filter(|v| v.is_object());
        Self {
            title: non_empty(value.get("title")),
            icon: non_empty(value.get("icon")),
            origin_url: origin.and_then(|o| {
                non_empty(o.get("url")).or_else(|| non_empty(o.get("path")))
            }),
            metadata_url: metadata.and_then(|m| {
                non_empty(m.get("uri")).or_else(|| non_empty(m.get("url")))
            }),
        }
    }

    /// Kind of resource implied by the icon.
    pub fn kind(&self) -> ResourceKind {
        match self.icon.as_deref() {
            Some(LINK_ICON) => ResourceKind::Link,
            Some(icon) if icon.contains("application/") => ResourceKind::File,
            _ => ResourceKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Link,
    Other,
}

/// Search hits plus the resource map, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub resources: HashMap<String, ResourceMetadata>,
}

impl SearchResults {
    /// Parses `{ "resources": {...}, "paragraphs": { "results": [...] } }`.
    pub fn from_find_shape(value: &Value) -> Self {
        let hits = value
            .get("paragraphs")
            .and_then(|p| p.get("results"))
            .and_then(|r| r.as_array())
            .map(|items| items.iter().map(SearchHit::from_value).collect())
            .unwrap_or_default();

        let resources = value
            .get("resources")
            .and_then(|r| r.as_object())
            .map(|map| {
                map.iter()
                    .map(|(rid, info)| (rid.clone(), ResourceMetadata::from_value(info)))
                    .collect()
            })
            .unwrap_or_default();

        Self { hits, resources }
    }

    /// Parses a flat list of hits that carry their own `title`.
    pub fn from_hit_list(items: &[Value]) -> Self {
        Self {
            hits: items.iter().map(SearchHit::from_value).collect(),
            resources: HashMap::new(),
        }
    }

    pub fn resource(&self, resource_id: &str) -> Option<&ResourceMetadata> {
        self.resources.get(resource_id)
    }

    /// The hit's own title, else its resource's title.
    pub fn title_of<'a>(&'a self, hit: &'a SearchHit) -> Option<&'a str> {
        hit.title.as_deref().or_else(|| {
            self.resource(&hit.resource_id)
                .and_then(|meta| meta.title.as_deref())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// The payload layouts a search result may arrive in.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPayload {
    /// A plain search response.
    TopLevel(SearchResults),
    /// `raw_response.retrieval_results` of a combined-ask response.
    AskRetrievalResults(SearchResults),
    /// `raw_response.retrieval.results` of a combined-ask response.
    AskRetrieval(SearchResults),
}

impl SearchPayload {
    /// Probes the top-level layout, then `raw_response.retrieval_results`,
    /// then `raw_response.retrieval.results`, and keeps the first one with at
    /// least one hit. Falls back to an empty top-level result.
    pub fn parse(raw: &Value) -> Self {
        let top_level = SearchResults::from_find_shape(raw);
        if !top_level.is_empty() {
            return SearchPayload::TopLevel(top_level);
        }

        if let Some(raw_response) = raw.get("raw_response").filter(|v| v.is_object()) {
            if let Some(results) = raw_response.get("retrieval_results") {
                let parsed = SearchResults::from_find_shape(results);
                if !parsed.is_empty() {
                    return SearchPayload::AskRetrievalResults(parsed);
                }
            }

            if let Some(results) = raw_response
                .get("retrieval")
                .filter(|v| v.is_object())
                .and_then(|r| r.get("results"))
            {
                let parsed = match results.as_array() {
                    Some(items) => SearchResults::from_hit_list(items),
                    None => SearchResults::from_find_shape(results),
                };
                if !parsed.is_empty() {
                    return SearchPayload::AskRetrieval(parsed);
                }
            }
        }

        SearchPayload::TopLevel(top_level)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            SearchPayload::AskRetrievalResults(_) => "raw_response.retrieval_results",
            SearchPayload::AskRetrieval(_) => "raw_response.retrieval.results",
            SearchPayload::TopLevel(_) => "top_level",
        }
    }

    pub fn into_results(self) -> SearchResults {
        match self {
            SearchPayload::AskRetrievalResults(results)
            | SearchPayload::AskRetrieval(results)
            | SearchPayload::TopLevel(results) => results,
        }
    }
}

/// A file field of a resource, as reported by the authoritative lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FileField {
    pub id: String,
    pub content_type: String,
    pub size: u64,
    pub filename: Option<String>,
}

/// Authoritative resource record from a direct resource fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDetails {
    pub id: String,
    /// File fields in provider order.
    pub files: Vec<FileField>,
}

impl ResourceDetails {
    pub fn from_value(value: &Value) -> Self {
        let files = value
            .get("data")
            .and_then(|d| d.get("files"))
            .and_then(|f| f.as_object())
            .map(|map| {
                map.iter()
                    .map(|(file_id, info)| {
                        let file = info.get("value").and_then(|v| v.get("file"));
                        FileField {
                            id: file_id.clone(),
                            content_type: file
                                .and_then(|f| f.get("content_type"))
                                .and_then(|v| v.as_str())
                                .unwrap_or_default()
                                .to_string(),
                            size: file
                                .and_then(|f| f.get("size"))
                                .and_then(|v| v.as_u64())
                                .unwrap_or(0),
                            filename: file.and_then(|f| non_empty(f.get("filename"))),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: str_field(value, "id"),
            files,
        }
    }

    /// First file field that exposes a content type.
    pub fn first_typed_file(&self) -> Option<&FileField> {
        self.files.iter().find(|f| !f.content_type.is_empty())
    }
}

/// Bytes of a file fetched server-side.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub content: axum::body::Bytes,
    pub content_type: Option<String>,
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn find_payload(rid: &str) -> Value {
        json!({
            "resources": {
                rid: {
                    "title": "Annual report",
                    "icon": "application/pdf",
                    "origin": { "url": "" , "path": "/docs/report.pdf" },
                    "metadata": { "uri": "https://example.org/report" }
                }
            },
            "paragraphs": {
                "results": [
                    { "rid": rid, "field": "/f/file", "text": "Revenue grew.", "score": 0.8,
                      "position": { "page_number": 4 } },
                    { "rid": rid, "field": "/f/file", "text": "No score here." }
                ]
            }
        })
    }

    #[test]
    fn parses_hits_and_resources() {
        let results = SearchResults::from_find_shape(&find_payload("r1"));
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].page, Some(4));
        assert_eq!(results.hits[0].score, Some(0.8));
        assert_eq!(results.hits[1].score, None);

        let meta = results.resource("r1").unwrap();
        assert_eq!(meta.title.as_deref(), Some("Annual report"));
        assert_eq!(meta.origin_url.as_deref(), Some("/docs/report.pdf"));
        assert_eq!(meta.metadata_url.as_deref(), Some("https://example.org/report"));
        assert_eq!(meta.kind(), ResourceKind::File);
    }

    #[test]
    fn resource_kind_follows_icon() {
        let link = ResourceMetadata {
            icon: Some(LINK_ICON.to_string()),
            ..Default::default()
        };
        let text = ResourceMetadata {
            icon: Some("text/plain".to_string()),
            ..Default::default()
        };
        assert_eq!(link.kind(), ResourceKind::Link);
        assert_eq!(text.kind(), ResourceKind::Other);
        assert_eq!(ResourceMetadata::default().kind(), ResourceKind::Other);
    }

    #[test]
    fn payload_prefers_top_level_then_retrieval_results_then_retrieval() {
        let raw = json!({
            "raw_response": { "retrieval_results": find_payload("nested") },
            "paragraphs": { "results": [ { "rid": "top", "text": "x" } ] }
        });
        let parsed = SearchPayload::parse(&raw);
        assert_eq!(parsed.shape(), "top_level");
        assert_eq!(parsed.into_results().hits[0].resource_id, "top");

        let raw = json!({
            "paragraphs": { "results": [] },
            "raw_response": {
                "retrieval_results": find_payload("a"),
                "retrieval": { "results": [ { "rid": "b", "text": "later" } ] }
            }
        });
        let parsed = SearchPayload::parse(&raw);
        assert_eq!(parsed.shape(), "raw_response.retrieval_results");
        assert_eq!(parsed.into_results().hits[0].resource_id, "a");

        let raw = json!({
            "raw_response": {
                "retrieval_results": { "paragraphs": { "results": [] } },
                "retrieval": { "results": [
                    { "rid": "b", "field": "/t/body", "text": "hello", "score": 0.5, "title": "B doc" }
                ] }
            }
        });
        let parsed = SearchPayload::parse(&raw);
        assert_eq!(parsed.shape(), "raw_response.retrieval.results");
        let results = parsed.into_results();
        assert_eq!(results.hits[0].resource_id, "b");
        assert_eq!(results.title_of(&results.hits[0]), Some("B doc"));
    }

    #[test]
    fn hit_list_titles_stay_with_each_hit() {
        let items = vec![
            json!({ "rid": "a1", "text": "one", "title": "Calendar" }),
            json!({ "rid": "a1", "text": "two", "title": "Syllabus" }),
            json!({ "rid": "a1", "text": "three" }),
        ];
        let results = SearchResults::from_hit_list(&items);
        let titles: Vec<Option<&str>> =
            results.hits.iter().map(|h| results.title_of(h)).collect();
        assert_eq!(titles, vec![Some("Calendar"), Some("Syllabus"), None]);
    }

    #[test]
    fn payload_without_any_hits_is_empty_top_level() {
        let parsed = SearchPayload::parse(&json!({ "raw_response": {} }));
        assert_eq!(parsed.shape(), "top_level");
        assert!(parsed.into_results().is_empty());
    }

    #[test]
    fn resource_details_keep_file_order() {
        let value = json!({
            "id": "r1",
            "title": "Budget",
            "data": { "files": {
                "zz-notes": { "value": { "file": { "content_type": "", "size": 1 } } },
                "aa-sheet": { "value": { "file": {
                    "content_type": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    "size": 2048, "filename": "budget.xlsx" } } }
            } }
        });
        let details = ResourceDetails::from_value(&value);
        assert_eq!(details.files[0].id, "zz-notes");
        let file = details.first_typed_file().unwrap();
        assert_eq!(file.id, "aa-sheet");
        assert_eq!(file.size, 2048);
        assert_eq!(file.filename.as_deref(), Some("budget.xlsx"));
    }
}
