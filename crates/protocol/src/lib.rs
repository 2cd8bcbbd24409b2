use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod path_filters;

pub const DEFAULT_HYBRID_LIMIT: usize = 10;
pub const DEFAULT_CONTEXT_LINES: usize = 3;
pub const DEFAULT_MIN_SCORE: f32 = 0.25;

/// One ranked chunk returned by the semantic backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticChunk {
    /// Absolute path of the backing file
    pub file_path: String,
    /// Path relative to the workspace root
    pub relative_path: String,
    #[serde(alias = "text", alias = "chunk")]
    pub content: String,
    /// 1-indexed, inclusive
    pub start_line: usize,
    /// 1-indexed, inclusive, never below `start_line`
    pub end_line: usize,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(alias = "similarity")]
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchRequest {
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchResponse {
    #[serde(default)]
    pub results: Vec<SemanticChunk>,
    #[serde(default)]
    pub query_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceEntry {
    pub id: String,
    pub path: String,
}

/// Workspace listings arrive either as a bare array or wrapped in `{"workspaces": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WorkspaceListing {
    Bare(Vec<WorkspaceEntry>),
    Wrapped { workspaces: Vec<WorkspaceEntry> },
}

impl WorkspaceListing {
    pub fn into_entries(self) -> Vec<WorkspaceEntry> {
        match self {
            WorkspaceListing::Bare(entries) => entries,
            WorkspaceListing::Wrapped { workspaces } => workspaces,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexStatus {
    #[serde(default)]
    pub vector_ready: bool,
    #[serde(default)]
    pub is_vector_indexing: bool,
    #[serde(default)]
    pub file_count: Option<u64>,
    #[serde(default)]
    pub chunk_count: Option<u64>,
}

impl IndexStatus {
    /// Index is missing and nobody is building it.
    pub fn needs_indexing(&self) -> bool {
        !self.vector_ready && !self.is_vector_indexing
    }
}

/// Symbol kinds recognized by structural matching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FocusCategory {
    Functions,
    Classes,
    Imports,
    Types,
    Tests,
    Config,
}

impl FocusCategory {
    pub const ALL: [FocusCategory; 6] = [
        FocusCategory::Functions,
        FocusCategory::Classes,
        FocusCategory::Imports,
        FocusCategory::Types,
        FocusCategory::Tests,
        FocusCategory::Config,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FocusCategory::Functions => "functions",
            FocusCategory::Classes => "classes",
            FocusCategory::Imports => "imports",
            FocusCategory::Types => "types",
            FocusCategory::Tests => "tests",
            FocusCategory::Config => "config",
        }
    }
}

impl fmt::Display for FocusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focus requested by a caller: one category or every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    #[default]
    All,
    Functions,
    Classes,
    Imports,
    Types,
    Tests,
    Config,
}

impl Focus {
    pub fn categories(self) -> &'static [FocusCategory] {
        match self {
            Focus::All => &FocusCategory::ALL,
            Focus::Functions => &[FocusCategory::Functions],
            Focus::Classes => &[FocusCategory::Classes],
            Focus::Imports => &[FocusCategory::Imports],
            Focus::Types => &[FocusCategory::Types],
            Focus::Tests => &[FocusCategory::Tests],
            Focus::Config => &[FocusCategory::Config],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Focus::All => "all",
            Focus::Functions => "functions",
            Focus::Classes => "classes",
            Focus::Imports => "imports",
            Focus::Types => "types",
            Focus::Tests => "tests",
            Focus::Config => "config",
        }
    }
}

impl FromStr for Focus {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Focus::All),
            "functions" => Ok(Focus::Functions),
            "classes" => Ok(Focus::Classes),
            "imports" => Ok(Focus::Imports),
            "types" => Ok(Focus::Types),
            "tests" => Ok(Focus::Tests),
            "config" => Ok(Focus::Config),
            other => Err(format!(
                "unknown focus '{other}' (expected functions|classes|imports|types|tests|config|all)"
            )),
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the hybrid (semantic + structural) search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HybridSearchParams {
    /// Natural-language query
    pub query: String,
    /// Workspace root; defaults to the current directory
    #[serde(default)]
    pub workspace: Option<String>,
    /// Relative path prefix restricting results
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub focus: Focus,
    /// Maximum number of matches (1-30, default 10)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Lines of surrounding context per match (default 3)
    #[serde(default)]
    pub context_lines: Option<usize>,
}

/// Parameters of the plain semantic search tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    pub query: String,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Suffix filter on the relative path, e.g. `rs` or `.test.ts`
    #[serde(default)]
    pub file_type: Option<String>,
    /// Minimum similarity (0.15-1.0, default 0.25)
    #[serde(default)]
    pub min_score: Option<f32>,
    /// Maximum number of matches (1-50, default 10)
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub context_lines: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
