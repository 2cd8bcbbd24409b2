use scout_vector_client::BackendError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Semantic backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Workspace not indexed: {0}")]
    WorkspaceNotIndexed(String),

    #[error("Semantic search timed out after {0} ms")]
    Timeout(u64),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    pub const fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "invalid_input",
            SearchError::BackendUnavailable(_) => "backend_unavailable",
            SearchError::WorkspaceNotIndexed(_) => "workspace_not_indexed",
            SearchError::Timeout(_) => "timeout",
            SearchError::Backend(_) => "backend_error",
            SearchError::Config(_) => "config_error",
        }
    }

    pub const fn hint(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "Provide a non-empty query.",
            SearchError::BackendUnavailable(_) => {
                "Make sure the semantic index service is running, then retry."
            }
            SearchError::WorkspaceNotIndexed(_) => {
                "Register and index this workspace with the index service first."
            }
            SearchError::Timeout(_) => {
                "The index service is slow to respond. Retry, or raise --timeout-ms."
            }
            SearchError::Backend(_) => "Retry the request. If it keeps failing, check the index service logs.",
            SearchError::Config(_) => "Fix the configuration and retry.",
        }
    }
}

impl From<BackendError> for SearchError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { url, reason } => {
                SearchError::BackendUnavailable(format!("{url}: {reason}"))
            }
            BackendError::WorkspaceNotIndexed(id) => SearchError::WorkspaceNotIndexed(id),
            BackendError::Timeout(ms) => SearchError::Timeout(ms),
            other @ (BackendError::IndexBuilding(_) | BackendError::Protocol(_)) => {
                SearchError::Backend(other.to_string())
            }
        }
    }
}
