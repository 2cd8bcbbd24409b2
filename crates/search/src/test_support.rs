use async_trait::async_trait;
use scout_protocol::{IndexStatus, SemanticChunk, SemanticSearchResponse, WorkspaceEntry};
use scout_vector_client::{BackendError, Result, SemanticBackend};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic in-memory backend.
pub struct FakeBackend {
    pub workspaces: Vec<WorkspaceEntry>,
    pub status: IndexStatus,
    pub chunks: Vec<SemanticChunk>,
    pub query_time_ms: u64,
    /// `search` never completes
    pub hang_search: bool,
    /// every call fails with `Unavailable`
    pub offline: bool,
    /// `search` and `index_status` report an index rebuild
    pub rebuilding: bool,
    pub trigger_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub last_limit: AtomicUsize,
}

impl FakeBackend {
    pub fn ready(chunks: Vec<SemanticChunk>) -> Self {
        Self {
            workspaces: vec![WorkspaceEntry {
                id: "ws-1".to_string(),
                path: "/repo".to_string(),
            }],
            status: IndexStatus {
                vector_ready: true,
                is_vector_indexing: false,
                file_count: Some(3),
                chunk_count: Some(chunks.len() as u64),
            },
            chunks,
            query_time_ms: 7,
            hang_search: false,
            offline: false,
            rebuilding: false,
            trigger_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        }
    }

    pub fn with_status(mut self, vector_ready: bool, is_vector_indexing: bool) -> Self {
        self.status.vector_ready = vector_ready;
        self.status.is_vector_indexing = is_vector_indexing;
        self
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(BackendError::Unavailable {
                url: "http://fake".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

pub fn chunk(path: &str, start_line: usize, content: &str, score: f32) -> SemanticChunk {
    SemanticChunk {
        file_path: format!("/repo/{path}"),
        relative_path: path.to_string(),
        content: content.to_string(),
        start_line,
        end_line: start_line + content.lines().count().saturating_sub(1),
        language: None,
        score,
    }
}

#[async_trait]
impl SemanticBackend for FakeBackend {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceEntry>> {
        self.check_online()?;
        Ok(self.workspaces.clone())
    }

    async fn index_status(&self, workspace_id: &str) -> Result<IndexStatus> {
        self.check_online()?;
        if self.rebuilding && !self.status.vector_ready {
            return Err(BackendError::IndexBuilding(workspace_id.to_string()));
        }
        Ok(self.status.clone())
    }

    async fn trigger_index(&self, _workspace_id: &str) -> Result<()> {
        self.check_online()?;
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        workspace_id: &str,
        _query: &str,
        limit: usize,
    ) -> Result<SemanticSearchResponse> {
        self.check_online()?;
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        if self.rebuilding {
            return Err(BackendError::IndexBuilding(workspace_id.to_string()));
        }
        if self.hang_search {
            std::future::pending::<()>().await;
        }
        Ok(SemanticSearchResponse {
            results: self.chunks.iter().take(limit).cloned().collect(),
            query_time_ms: self.query_time_ms,
        })
    }
}
