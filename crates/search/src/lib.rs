//! # Scout Search
//!
//! Hybrid code retrieval: semantic chunks from an external index, fused with regex
//! structural matches and widened with on-disk context.
//!
//! ```text
//! query ──> QueryTokenizer ──> terms ─────────────┐
//!   │                                             v
//!   └──> SemanticBackend ──> chunks ──> StructuralMatcher ──> ResultFusionEngine
//!                                                                    │
//!                         ResultFormatter <── ContextEnricher <──────┘
//! ```

mod config;
mod engine;
mod enrich;
mod error;
mod format;
mod fusion;
mod language;
mod patterns;
mod query;
mod structural;
mod tokenizer;
mod types;

#[cfg(test)]
mod test_support;

pub use config::{LimitConfig, RetrievalConfig};
pub use engine::{
    RetrievalEngine, RetrievalOutcome, RetrievalReport, RetrievalStage, WorkspaceStatus,
};
pub use enrich::{ContextEnricher, FsSourceReader, SourceReader};
pub use error::{Result, SearchError};
pub use format::ResultFormatter;
pub use fusion::ResultFusionEngine;
pub use language::{display_language, Language};
pub use patterns::{pattern_table, PatternLanguage, PatternTable, StructuralPattern};
pub use query::{HybridQuery, SemanticQuery};
pub use structural::StructuralMatcher;
pub use tokenizer::{QueryTerms, QueryTokenizer};
pub use types::{
    Cancelled, CodeMatch, ContextWindow, EnrichedMatch, MatchKey, MatchType, StructuralCandidate,
};
