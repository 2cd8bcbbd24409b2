use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Semantic backend unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Workspace not indexed: {0}")]
    WorkspaceNotIndexed(String),

    #[error("Index is still building for workspace {0}")]
    IndexBuilding(String),

    #[error("Semantic backend timed out after {0} ms")]
    Timeout(u64),

    #[error("Unexpected backend response: {0}")]
    Protocol(String),
}
