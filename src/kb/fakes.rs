//! In-memory [`KnowledgeBox`] used by unit tests across the crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::provider::{AskRequest, KnowledgeBox, SearchRequest};
use super::types::{DownloadedFile, ResourceDetails};
use crate::core::errors::ApiError;

#[derive(Default)]
pub(crate) struct FakeKnowledgeBox {
    pub search_payload: Value,
    pub ask_payload: Value,
    pub resources: HashMap<String, ResourceDetails>,
    pub files: HashMap<(String, String), DownloadedFile>,
    pub fail_search: bool,
    pub fail_download_urls: bool,
    pub resource_lookups: Mutex<Vec<String>>,
    pub url_requests: Mutex<Vec<(String, String, u64)>>,
    pub searches: Mutex<Vec<SearchRequest>>,
}

impl FakeKnowledgeBox {
    pub fn with_search(payload: Value) -> Self {
        Self {
            search_payload: payload,
            ..Default::default()
        }
    }

    pub fn with_resource(mut self, details: ResourceDetails) -> Self {
        self.resources.insert(details.id.clone(), details);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.resource_lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBox for FakeKnowledgeBox {
    fn kb_id(&self) -> &str {
        "kb-test"
    }

    fn resource_url(&self, resource_id: &str) -> String {
        format!("https://europe-1.nuclia.cloud/api/v1/kb/kb-test/resource/{}", resource_id)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, ApiError> {
        self.searches.lock().unwrap().push(request.clone());
        if self.fail_search {
            return Err(ApiError::UpstreamSearch {
                status: 503,
                detail: "index unavailable".to_string(),
            });
        }
        Ok(self.search_payload.clone())
    }

    async fn resource(&self, resource_id: &str) -> Result<ResourceDetails, ApiError> {
        self.resource_lookups
            .lock()
            .unwrap()
            .push(resource_id.to_string());
        self.resources
            .get(resource_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("resource {}", resource_id)))
    }

    async fn temporal_download_url(
        &self,
        resource_id: &str,
        file_id: &str,
        ttl_secs: u64,
    ) -> Result<String, ApiError> {
        self.url_requests.lock().unwrap().push((
            resource_id.to_string(),
            file_id.to_string(),
            ttl_secs,
        ));
        if self.fail_download_urls {
            return Err(ApiError::internal("token endpoint down"));
        }
        Ok(format!(
            "https://europe-1.nuclia.cloud/api/v1/kb/kb-test/resource/{}/file/{}/download/field?eph-token=t",
            resource_id, file_id
        ))
    }

    async fn ask(&self, _request: &AskRequest) -> Result<Value, ApiError> {
        if self.ask_payload.is_null() {
            return Ok(json!({ "answer": "" }));
        }
        Ok(self.ask_payload.clone())
    }

    async fn download_file(
        &self,
        resource_id: &str,
        file_id: &str,
    ) -> Result<DownloadedFile, ApiError> {
        self.files
            .get(&(resource_id.to_string(), file_id.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("file {}/{}", resource_id, file_id)))
    }
}
