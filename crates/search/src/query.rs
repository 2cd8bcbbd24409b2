use crate::config::LimitConfig;
use crate::error::{Result, SearchError};
use scout_protocol::path_filters::normalize_scope;
use scout_protocol::{Focus, HybridSearchParams, SemanticSearchParams};
use std::path::PathBuf;

/// Validated hybrid retrieval request. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    pub text: String,
    pub workspace: PathBuf,
    pub scope: Option<String>,
    pub focus: Focus,
    pub limit: usize,
    pub context_lines: usize,
}

impl HybridQuery {
    /// Checks the query text, resolves the workspace and clamps the numeric knobs.
    pub fn from_params(params: HybridSearchParams, limits: &LimitConfig) -> Result<Self> {
        let text = require_text(&params.query)?;
        Ok(Self {
            text,
            workspace: workspace_root(params.workspace.as_deref())?,
            scope: params.scope.as_deref().and_then(normalize_scope),
            focus: params.focus,
            limit: clamp_limit(params.limit, limits.default_limit, limits.max_hybrid_limit),
            context_lines: clamp_context(params.context_lines, limits),
        })
    }
}

/// Validated semantic-only request.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticQuery {
    pub text: String,
    pub workspace: PathBuf,
    pub scope: Option<String>,
    pub file_type: Option<String>,
    pub min_score: f32,
    pub limit: usize,
    pub context_lines: usize,
}

impl SemanticQuery {
    pub fn from_params(params: SemanticSearchParams, limits: &LimitConfig) -> Result<Self> {
        let text = require_text(&params.query)?;
        let min_score = params
            .min_score
            .filter(|score| score.is_finite())
            .unwrap_or(limits.default_min_score)
            .clamp(limits.min_score_floor, 1.0);
        Ok(Self {
            text,
            workspace: workspace_root(params.workspace.as_deref())?,
            scope: params.scope.as_deref().and_then(normalize_scope),
            file_type: params
                .file_type
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty()),
            min_score,
            limit: clamp_limit(params.limit, limits.default_limit, limits.max_semantic_limit),
            context_lines: clamp_context(params.context_lines, limits),
        })
    }
}

fn require_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(SearchError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(text.to_string())
}

fn workspace_root(raw: Option<&str>) -> Result<PathBuf> {
    match raw.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) => Ok(PathBuf::from(path)),
        None => std::env::current_dir().map_err(|err| {
            SearchError::InvalidInput(format!("no workspace given and cwd is unreadable: {err}"))
        }),
    }
}

fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max.max(1))
}

fn clamp_context(requested: Option<usize>, limits: &LimitConfig) -> usize {
    requested
        .unwrap_or(limits.default_context_lines)
        .min(limits.max_context_lines)
}
