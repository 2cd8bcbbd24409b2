use crate::error::Result;
use async_trait::async_trait;
use scout_protocol::{IndexStatus, SemanticSearchResponse, WorkspaceEntry};
use std::sync::Arc;

/// Narrow view of the external semantic index.
///
/// Implementations must return an empty result list rather than an error when a
/// query simply has no hits.
#[async_trait]
pub trait SemanticBackend: Send + Sync {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceEntry>>;

    async fn index_status(&self, workspace_id: &str) -> Result<IndexStatus>;

    /// Asks the service to (re)build the vector index. Returns once the request is accepted.
    async fn trigger_index(&self, workspace_id: &str) -> Result<()>;

    async fn search(
        &self,
        workspace_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<SemanticSearchResponse>;
}

#[async_trait]
impl<B: SemanticBackend + ?Sized> SemanticBackend for Arc<B> {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceEntry>> {
        (**self).list_workspaces().await
    }

    async fn index_status(&self, workspace_id: &str) -> Result<IndexStatus> {
        (**self).index_status(workspace_id).await
    }

    async fn trigger_index(&self, workspace_id: &str) -> Result<()> {
        (**self).trigger_index(workspace_id).await
    }

    async fn search(
        &self,
        workspace_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<SemanticSearchResponse> {
        (**self).search(workspace_id, query, limit).await
    }
}
