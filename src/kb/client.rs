use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};

use super::ask_stream::AskStreamFolder;
use super::provider::{AskRequest, KnowledgeBox, SearchRequest};
use super::types::{DownloadedFile, ResourceDetails};
use crate::core::config::NucliaConfig;
use crate::core::errors::{truncate_detail, ApiError};

const SERVICE_ACCOUNT_HEADER: &str = "x-nuclia-serviceaccount";
const SYNCHRONOUS_HEADER: &str = "x-synchronous";

/// Which error family a failed upstream call belongs to.
#[derive(Debug, Clone, Copy)]
enum Upstream {
    Search,
    Ask,
    Lookup,
}

/// HTTP client for the managed knowledge base.
#[derive(Clone)]
pub struct NucliaClient {
    config: Arc<NucliaConfig>,
    kb_url: String,
    headers: HeaderMap,
    client: Client,
}

impl NucliaClient {
    pub fn new(config: Arc<NucliaConfig>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(SERVICE_ACCOUNT_HEADER),
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))?,
        );
        for (name, value) in &config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        Ok(Self {
            kb_url: config.kb_url(),
            config,
            headers,
            client: Client::new(),
        })
    }

    fn file_url(&self, resource_id: &str, file_id: &str) -> String {
        format!(
            "{}/resource/{}/file/{}/download/field",
            self.kb_url,
            urlencoding::encode(resource_id),
            urlencoding::encode(file_id)
        )
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.headers(self.headers.clone())
    }

    fn search_query(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", request.query.clone()),
            ("size", request.size.to_string()),
        ];
        for feature in &request.features {
            params.push(("features", feature.as_str().to_string()));
        }
        if request.uses_semantic() {
            let vectorset = request
                .vectorset
                .clone()
                .unwrap_or_else(|| self.config.vectorset.clone());
            params.push(("vectorset", vectorset));
        }
        for filter in &request.filters {
            params.push(("filters", filter.clone()));
        }
        for facet in &request.faceted {
            params.push(("faceted", facet.clone()));
        }
        if let Some(sort) = &request.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(min_score) = request.min_score {
            params.push(("min_score", min_score.to_string()));
        }
        params
    }

    async fn ask_streaming(&self, response: Response) -> Result<Value, ApiError> {
        let mut folder = AskStreamFolder::new();
        let mut stream = response.bytes_stream();
        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|err| transport_error(Upstream::Ask, err))?;
            folder.push_bytes(&bytes)?;
        }
        folder.finish()
    }
}

#[async_trait]
impl KnowledgeBox for NucliaClient {
    fn kb_id(&self) -> &str {
        &self.config.kb
    }

    fn resource_url(&self, resource_id: &str) -> String {
        format!("{}/resource/{}", self.kb_url, resource_id)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, ApiError> {
        let url = format!("{}/search", self.kb_url);
        tracing::debug!(size = request.size, features = ?request.features, "Knowledge base search");

        let res = self
            .authed(self.client.get(&url))
            .query(&self.search_query(request))
            .timeout(self.config.search_timeout())
            .send()
            .await
            .map_err(|err| transport_error(Upstream::Search, err))?;
        let res = ensure_success(Upstream::Search, res).await?;

        res.json::<Value>()
            .await
            .map_err(|err| transport_error(Upstream::Search, err))
    }

    async fn resource(&self, resource_id: &str) -> Result<ResourceDetails, ApiError> {
        let url = format!("{}/resource/{}", self.kb_url, urlencoding::encode(resource_id));
        tracing::debug!(resource_id, "Fetching resource");

        let res = self
            .authed(self.client.get(&url))
            .query(&[("show", "basic"), ("show", "values"), ("show", "origin")])
            .timeout(self.config.search_timeout())
            .send()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;
        let res = ensure_success(Upstream::Lookup, res).await?;

        let payload: Value = res
            .json()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;
        Ok(ResourceDetails::from_value(&payload))
    }

    async fn temporal_download_url(
        &self,
        resource_id: &str,
        file_id: &str,
        ttl_secs: u64,
    ) -> Result<String, ApiError> {
        let url = format!("{}/ephemeral_tokens", self.kb_url);
        tracing::debug!(resource_id, file_id, ttl_secs, "Requesting temporary download URL");

        let res = self
            .authed(self.client.post(&url))
            .json(&json!({ "ttl": ttl_secs }))
            .timeout(self.config.search_timeout())
            .send()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;
        let res = ensure_success(Upstream::Lookup, res).await?;

        let payload: Value = res
            .json()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;
        let token = payload
            .get("token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::Internal("ephemeral token missing from response".to_string())
            })?;

        Ok(format!(
            "{}?eph-token={}",
            self.file_url(resource_id, file_id),
            urlencoding::encode(token)
        ))
    }

    async fn ask(&self, request: &AskRequest) -> Result<Value, ApiError> {
        let url = format!("{}/ask", self.kb_url);
        tracing::debug!(synchronous = request.synchronous, "Knowledge base ask");

        let mut builder = self
            .authed(self.client.post(&url))
            .json(request)
            .timeout(self.config.ask_timeout());
        if request.synchronous {
            builder = builder.header(SYNCHRONOUS_HEADER, "true");
        }

        let res = builder
            .send()
            .await
            .map_err(|err| transport_error(Upstream::Ask, err))?;
        let res = ensure_success(Upstream::Ask, res).await?;

        if request.synchronous {
            return res
                .json::<Value>()
                .await
                .map_err(|err| transport_error(Upstream::Ask, err));
        }
        self.ask_streaming(res).await
    }

    async fn download_file(
        &self,
        resource_id: &str,
        file_id: &str,
    ) -> Result<DownloadedFile, ApiError> {
        let url = self.file_url(resource_id, file_id);
        tracing::debug!(resource_id, file_id, "Downloading file");

        let res = self
            .authed(self.client.get(&url))
            .timeout(self.config.download_timeout())
            .send()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;
        let res = ensure_success(Upstream::Lookup, res).await?;

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let content = res
            .bytes()
            .await
            .map_err(|err| transport_error(Upstream::Lookup, err))?;

        Ok(DownloadedFile {
            content,
            content_type,
        })
    }
}

async fn ensure_success(kind: Upstream, res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(upstream_error(kind, status.as_u16(), &body))
}

fn upstream_error(kind: Upstream, status: u16, body: &str) -> ApiError {
    let detail = truncate_detail(body);
    match kind {
        Upstream::Search => ApiError::UpstreamSearch { status, detail },
        Upstream::Ask => ApiError::UpstreamAsk { status, detail },
        Upstream::Lookup => ApiError::Internal(format!(
            "knowledge base lookup failed ({}): {}",
            status, detail
        )),
    }
}

fn transport_error(kind: Upstream, err: reqwest::Error) -> ApiError {
    let status = err.status().map(|s| s.as_u16()).unwrap_or(502);
    upstream_error(kind, status, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::provider::SearchFeature;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::BTreeMap;

    fn test_config(base: &str) -> Arc<NucliaConfig> {
        Arc::new(NucliaConfig {
            api_base: base.to_string(),
            kb: "kb-test".to_string(),
            api_key: "service-key".to_string(),
            extra_headers: BTreeMap::from([("x-ndb-client".to_string(), "web".to_string())]),
            vectorset: "multilingual-2024-05-06".to_string(),
            internal_domains: vec!["nuclia".to_string()],
            download_url_ttl_secs: 3600,
            search_timeout_secs: 5,
            ask_timeout_secs: 5,
            download_timeout_secs: 5,
        })
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn echo_search(
        headers: AxumHeaders,
        Query(params): Query<Vec<(String, String)>>,
    ) -> Json<Value> {
        Json(json!({
            "auth": headers.get("x-nuclia-serviceaccount").and_then(|v| v.to_str().ok()),
            "client": headers.get("x-ndb-client").and_then(|v| v.to_str().ok()),
            "params": params,
        }))
    }

    #[tokio::test]
    async fn search_sends_credentials_and_repeated_params() {
        let app = Router::new().route("/kb/kb-test/search", get(echo_search));
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let mut request = SearchRequest::new("tuition fees", 10).with_min_score(0.2);
        request.filters = vec!["/a".to_string(), "/b".to_string()];
        let payload = client.search(&request).await.unwrap();

        assert_eq!(payload["auth"], json!("Bearer service-key"));
        assert_eq!(payload["client"], json!("web"));
        let params: Vec<(String, String)> =
            serde_json::from_value(payload["params"].clone()).unwrap();
        let values = |key: &str| -> Vec<String> {
            params.iter().filter(|(k, _)| k == key).map(|(_, v)| v.clone()).collect()
        };
        assert_eq!(values("query"), vec!["tuition fees"]);
        assert_eq!(values("features"), vec!["keyword", "semantic"]);
        assert_eq!(values("vectorset"), vec!["multilingual-2024-05-06"]);
        assert_eq!(values("filters"), vec!["/a", "/b"]);
        assert_eq!(values("min_score"), vec!["0.2"]);
    }

    #[tokio::test]
    async fn keyword_search_omits_vectorset() {
        let app = Router::new().route("/kb/kb-test/search", get(echo_search));
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let request =
            SearchRequest::new("q", 5).with_features(vec![SearchFeature::Keyword]);
        let payload = client.search(&request).await.unwrap();
        let params = payload["params"].as_array().unwrap();
        assert!(params.iter().all(|p| p[0] != json!("vectorset")));
    }

    #[tokio::test]
    async fn search_failure_carries_status_and_truncated_body() {
        let app = Router::new().route(
            "/kb/kb-test/search",
            get(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "x".repeat(2000)) }),
        );
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let err = client.search(&SearchRequest::new("q", 5)).await.unwrap_err();
        match err {
            ApiError::UpstreamSearch { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail.len(), 600);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resource_and_temporal_url() {
        let app = Router::new()
            .route(
                "/kb/kb-test/resource/:rid",
                get(|Path(rid): Path<String>| async move {
                    Json(json!({
                        "id": rid,
                        "title": "Guide",
                        "data": { "files": { "f1": { "value": { "file": {
                            "content_type": "application/pdf", "size": 10 } } } } }
                    }))
                }),
            )
            .route(
                "/kb/kb-test/ephemeral_tokens",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["ttl"], json!(3600));
                    Json(json!({ "token": "tmp-123" }))
                }),
            );
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let details = client.resource("r1").await.unwrap();
        assert_eq!(details.id, "r1");
        assert_eq!(details.first_typed_file().unwrap().id, "f1");

        let url = client.temporal_download_url("r1", "f1", 3600).await.unwrap();
        assert_eq!(
            url,
            format!("{}/kb/kb-test/resource/r1/file/f1/download/field?eph-token=tmp-123", base)
        );
    }

    #[tokio::test]
    async fn synchronous_ask_sets_header() {
        let app = Router::new().route(
            "/kb/kb-test/ask",
            post(|headers: AxumHeaders, Json(body): Json<Value>| async move {
                let sync = headers.get("x-synchronous").is_some();
                Json(json!({ "answer": format!("sync={} q={}", sync, body["query"]) }))
            }),
        );
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let request = AskRequest {
            query: "hi".to_string(),
            synchronous: true,
            ..Default::default()
        };
        let response = client.ask(&request).await.unwrap();
        assert_eq!(response["answer"], json!("sync=true q=\"hi\""));
    }

    #[tokio::test]
    async fn streaming_ask_is_folded() {
        let app = Router::new().route(
            "/kb/kb-test/ask",
            post(|| async {
                concat!(
                    "{\"item\":{\"type\":\"answer\",\"text\":\"Hel\"}}\n",
                    "{\"item\":{\"type\":\"answer\",\"text\":\"lo\"}}\n"
                )
                .into_response()
            }),
        );
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let request = AskRequest {
            query: "hi".to_string(),
            synchronous: false,
            ..Default::default()
        };
        let response = client.ask(&request).await.unwrap();
        assert_eq!(response["answer"], json!("Hello"));
    }

    #[tokio::test]
    async fn download_returns_bytes_and_content_type() {
        let app = Router::new().route(
            "/kb/kb-test/resource/:rid/file/:fid/download/field",
            get(|| async { ([("content-type", "application/pdf")], vec![1u8; 20_000]) }),
        );
        let base = spawn(app).await;
        let client = NucliaClient::new(test_config(&base)).unwrap();

        let file = client.download_file("r1", "f1").await.unwrap();
        assert_eq!(file.content.len(), 20_000);
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    }
}
