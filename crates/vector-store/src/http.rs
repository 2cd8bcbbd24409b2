use crate::backend::SemanticBackend;
use crate::error::{BackendError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use scout_protocol::{
    IndexStatus, SemanticSearchRequest, SemanticSearchResponse, WorkspaceEntry, WorkspaceListing,
};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// HTTP client for the semantic index service.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| BackendError::Unavailable {
                url: base_url.clone(),
                reason: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn workspace_url(&self, workspace_id: &str, tail: &str) -> String {
        self.url(&format!("/api/workspaces/{workspace_id}{tail}"))
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            return BackendError::Timeout(self.request_timeout.as_millis() as u64);
        }
        if err.is_decode() {
            return BackendError::Protocol(format!("invalid JSON from {url}: {err}"));
        }
        BackendError::Unavailable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    async fn check_status(
        &self,
        url: &str,
        response: Response,
        workspace_id: Option<&str>,
    ) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!("Backend returned {status} for {url}: {body}");

        match (status, workspace_id) {
            (StatusCode::NOT_FOUND, Some(id)) => {
                Err(BackendError::WorkspaceNotIndexed(id.to_string()))
            }
            (StatusCode::CONFLICT | StatusCode::LOCKED, Some(id)) => {
                Err(BackendError::IndexBuilding(id.to_string()))
            }
            (StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY, _) => {
                Err(BackendError::Unavailable {
                    url: url.to_string(),
                    reason: format!("HTTP {status}"),
                })
            }
            _ => Err(BackendError::Protocol(format!(
                "HTTP {status} from {url}: {}",
                body.trim()
            ))),
        }
    }

    async fn decode<T: DeserializeOwned>(&self, url: &str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| self.transport_error(url, err))
    }
}

#[async_trait]
impl SemanticBackend for HttpBackend {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceEntry>> {
        let url = self.url("/api/workspaces");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.transport_error(&url, err))?;
        let response = self.check_status(&url, response, None).await?;
        let listing: WorkspaceListing = self.decode(&url, response).await?;
        Ok(listing.into_entries())
    }

    async fn index_status(&self, workspace_id: &str) -> Result<IndexStatus> {
        let url = self.workspace_url(workspace_id, "/status");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| self.transport_error(&url, err))?;
        let response = self.check_status(&url, response, Some(workspace_id)).await?;
        self.decode(&url, response).await
    }

    async fn trigger_index(&self, workspace_id: &str) -> Result<()> {
        let url = self.workspace_url(workspace_id, "/index");
        log::info!("Requesting vector index build for workspace {workspace_id}");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|err| self.transport_error(&url, err))?;
        match self.check_status(&url, response, Some(workspace_id)).await {
            Ok(_) => Ok(()),
            // Someone else already started the build.
            Err(BackendError::IndexBuilding(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn search(
        &self,
        workspace_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<SemanticSearchResponse> {
        let url = self.workspace_url(workspace_id, "/search/semantic");
        let started = Instant::now();
        let request = SemanticSearchRequest {
            query: query.to_string(),
            limit,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(&url, err))?;
        let response = self.check_status(&url, response, Some(workspace_id)).await?;
        let mut decoded: SemanticSearchResponse = self.decode(&url, response).await?;

        if decoded.query_time_ms == 0 {
            decoded.query_time_ms = started.elapsed().as_millis() as u64;
        }
        log::debug!(
            "Semantic search returned {} chunks in {} ms",
            decoded.results.len(),
            decoded.query_time_ms
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn lists_wrapped_workspaces() {
        let app = Router::new().route(
            "/api/workspaces",
            get(|| async { Json(json!({"workspaces": [{"id": "w1", "path": "/repo"}]})) }),
        );
        let url = spawn_server(app).await;

        let workspaces = backend(&url).list_workspaces().await.unwrap();
        assert_eq!(
            workspaces,
            vec![WorkspaceEntry {
                id: "w1".to_string(),
                path: "/repo".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn search_posts_query_and_limit() {
        let app = Router::new().route(
            "/api/workspaces/:id/search/semantic",
            post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(id, "w1");
                assert_eq!(body["query"], "parse config");
                assert_eq!(body["limit"], 7);
                Json(json!({
                    "results": [{
                        "file_path": "/repo/src/config.rs",
                        "relative_path": "src/config.rs",
                        "content": "fn parse_config() {}",
                        "start_line": 10,
                        "end_line": 12,
                        "language": "rust",
                        "score": 0.8
                    }],
                    "query_time_ms": 42
                }))
            }),
        );
        let url = spawn_server(app).await;

        let response = backend(&url).search("w1", "parse config", 7).await.unwrap();
        assert_eq!(response.query_time_ms, 42);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].relative_path, "src/config.rs");
    }

    #[tokio::test]
    async fn not_found_maps_to_workspace_not_indexed() {
        let app = Router::new().route(
            "/api/workspaces/:id/status",
            get(|| async { (AxumStatus::NOT_FOUND, "unknown workspace") }),
        );
        let url = spawn_server(app).await;

        let err = backend(&url).index_status("w9").await.unwrap_err();
        assert!(matches!(err, BackendError::WorkspaceNotIndexed(id) if id == "w9"));
    }

    #[tokio::test]
    async fn conflict_maps_to_index_building() {
        let app = Router::new().route(
            "/api/workspaces/:id/search/semantic",
            post(|| async { (AxumStatus::CONFLICT, "indexing") }),
        );
        let url = spawn_server(app).await;

        let err = backend(&url).search("w1", "q", 5).await.unwrap_err();
        assert!(matches!(err, BackendError::IndexBuilding(_)));
    }

    #[tokio::test]
    async fn trigger_index_accepts_concurrent_build() {
        let app = Router::new().route(
            "/api/workspaces/:id/index",
            post(|| async { (AxumStatus::CONFLICT, "already indexing") }),
        );
        let url = spawn_server(app).await;

        backend(&url).trigger_index("w1").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_json_is_a_protocol_error() {
        let app = Router::new().route(
            "/api/workspaces/:id/status",
            get(|| async { "not json" }),
        );
        let url = spawn_server(app).await;

        let err = backend(&url).index_status("w1").await.unwrap_err();
        assert!(matches!(err, BackendError::Protocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let app = Router::new().route(
            "/api/workspaces/:id/search/semantic",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"results": []}))
            }),
        );
        let url = spawn_server(app).await;
        let backend = HttpBackend::new(&url, Duration::from_millis(100)).unwrap();

        let err = backend.search("w1", "q", 5).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(100)), "{err:?}");
    }

    #[tokio::test]
    async fn closed_port_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{addr}"))
            .list_workspaces()
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable { .. }), "{err:?}");
    }
}
