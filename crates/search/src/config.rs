use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for one retrieval engine instance.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Base URL of the semantic index service
    pub backend_url: String,
    /// Hard bound on each backend call
    pub backend_timeout_ms: u64,
    /// Multiplier applied to a structural match's originating chunk score
    pub structural_boost: f32,
    /// Lines before a declaration scanned for query terms
    pub window_before: usize,
    /// Lines after a declaration scanned for query terms
    pub window_after: usize,
    /// Files above this size are never read for context
    pub max_enrich_file_bytes: u64,
    /// Semantic chunks requested per wanted result
    pub candidate_multiplier: usize,
    pub max_display_lines: usize,
    pub limits: LimitConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitConfig {
    pub default_limit: usize,
    pub max_hybrid_limit: usize,
    pub max_semantic_limit: usize,
    pub default_context_lines: usize,
    pub max_context_lines: usize,
    pub default_min_score: f32,
    pub min_score_floor: f32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            default_limit: scout_protocol::DEFAULT_HYBRID_LIMIT,
            max_hybrid_limit: 30,
            max_semantic_limit: 50,
            default_context_lines: scout_protocol::DEFAULT_CONTEXT_LINES,
            max_context_lines: 50,
            default_min_score: scout_protocol::DEFAULT_MIN_SCORE,
            min_score_floor: 0.15,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:3210".to_string(),
            backend_timeout_ms: 30_000,
            structural_boost: 1.2,
            window_before: 5,
            window_after: 10,
            max_enrich_file_bytes: 1024 * 1024,
            candidate_multiplier: 3,
            max_display_lines: 20,
            limits: LimitConfig::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| SearchError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SearchError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&raw).map_err(|err| match err {
            SearchError::Config(message) => {
                SearchError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.structural_boost.is_finite() && self.structural_boost > 0.0) {
            return Err(SearchError::Config(format!(
                "structural_boost must be positive (got {})",
                self.structural_boost
            )));
        }
        if self.backend_timeout_ms == 0 {
            return Err(SearchError::Config(
                "backend_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.backend_url.trim().is_empty() {
            return Err(SearchError::Config("backend_url must not be empty".to_string()));
        }
        if self.candidate_multiplier == 0 {
            return Err(SearchError::Config(
                "candidate_multiplier must be at least 1".to_string(),
            ));
        }
        let limits = &self.limits;
        if limits.max_hybrid_limit == 0 || limits.max_semantic_limit == 0 {
            return Err(SearchError::Config("result limits must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&limits.min_score_floor) {
            return Err(SearchError::Config(format!(
                "limits.min_score_floor must be within [0, 1] (got {})",
                limits.min_score_floor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHIPPED_DEFAULTS: &str = include_str!("../../../profiles/default.toml");

    #[test]
    fn shipped_profile_matches_defaults() {
        let parsed = RetrievalConfig::from_toml_str(SHIPPED_DEFAULTS).unwrap();
        assert_eq!(parsed, RetrievalConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let parsed = RetrievalConfig::from_toml_str(
            "structural_boost = 1.5\n[limits]\nmax_hybrid_limit = 12\n",
        )
        .unwrap();
        assert_eq!(parsed.structural_boost, 1.5);
        assert_eq!(parsed.limits.max_hybrid_limit, 12);
        assert_eq!(parsed.window_before, 5);
        assert_eq!(parsed.limits.max_semantic_limit, 50);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(RetrievalConfig::from_toml_str("structural_boost = 0.0").is_err());
        assert!(RetrievalConfig::from_toml_str("backend_timeout_ms = 0").is_err());
        assert!(RetrievalConfig::from_toml_str("unknown_key = 1").is_err());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scout.toml");
        std::fs::write(&path, "window_after = 4\n").unwrap();

        let parsed = RetrievalConfig::from_file(&path).unwrap();
        assert_eq!(parsed.window_after, 4);

        let missing = RetrievalConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(missing.code(), "config_error");
    }
}
