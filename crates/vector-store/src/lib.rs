//! # Scout Vector Client
//!
//! Client side of the external embedding / vector index service.
//!
//! The index itself (embedding model, HNSW graph, workspace registration) lives in a
//! separate service. This crate only talks to it:
//!
//! ```text
//! RetrievalEngine
//!     │
//!     └──> SemanticBackend (trait)
//!            ├─> list_workspaces  GET  /api/workspaces
//!            ├─> index_status     GET  /api/workspaces/{id}/status
//!            ├─> trigger_index    POST /api/workspaces/{id}/index
//!            └─> search           POST /api/workspaces/{id}/search/semantic
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use scout_vector_client::{HttpBackend, SemanticBackend};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new("http://127.0.0.1:3210", Duration::from_secs(30))?;
//!     let response = backend.search("ws-1", "token refresh", 10).await?;
//!
//!     for chunk in response.results {
//!         println!("{}:{} {:.3}", chunk.relative_path, chunk.start_line, chunk.score);
//!     }
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
mod http;

pub use backend::SemanticBackend;
pub use error::{BackendError, Result};
pub use http::HttpBackend;
pub use scout_protocol::{IndexStatus, SemanticChunk, SemanticSearchResponse, WorkspaceEntry};
