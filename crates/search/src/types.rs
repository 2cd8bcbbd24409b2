use crate::language::display_language;
use scout_protocol::{FocusCategory, SemanticChunk};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Semantic,
    Structural,
}

impl MatchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchType::Semantic => "semantic",
            MatchType::Structural => "structural",
        }
    }
}

/// Deduplication key of a match within one result set.
pub type MatchKey = (String, usize, MatchType);

/// A symbol declaration found by the pattern table inside a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralCandidate {
    pub symbol_name: String,
    pub kind: FocusCategory,
    /// 1-indexed line of the declaration within the chunk text
    pub line_offset: usize,
    /// 1-indexed last line of the relevance window within the chunk text
    pub window_end: usize,
    /// Whether the relevance window mentions any query term
    pub relevant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeMatch {
    pub file_path: String,
    pub relative_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub code: String,
    pub language: String,
    pub score: f32,
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<FocusCategory>,
}

impl CodeMatch {
    pub fn semantic(chunk: &SemanticChunk) -> Self {
        Self {
            file_path: chunk.file_path.clone(),
            relative_path: chunk.relative_path.clone(),
            line_start: chunk.start_line,
            line_end: chunk.end_line.max(chunk.start_line),
            code: chunk.content.clone(),
            language: display_language(chunk.language.as_deref(), &chunk.relative_path),
            score: chunk.score,
            match_type: MatchType::Semantic,
            symbol_name: None,
            symbol_kind: None,
        }
    }

    /// Match for a declaration inside `chunk`, covering the declaration line through
    /// the end of its relevance window.
    pub fn structural(chunk: &SemanticChunk, candidate: &StructuralCandidate, boost: f32) -> Self {
        let first = candidate.line_offset.max(1);
        let last = candidate.window_end.max(first);
        let code = chunk
            .content
            .split('\n')
            .skip(first - 1)
            .take(last - first + 1)
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            file_path: chunk.file_path.clone(),
            relative_path: chunk.relative_path.clone(),
            line_start: chunk.start_line + first - 1,
            line_end: chunk.start_line + last - 1,
            code,
            language: display_language(chunk.language.as_deref(), &chunk.relative_path),
            score: chunk.score * boost,
            match_type: MatchType::Structural,
            symbol_name: Some(candidate.symbol_name.clone()),
            symbol_kind: Some(candidate.kind),
        }
    }

    pub fn key(&self) -> MatchKey {
        (self.relative_path.clone(), self.line_start, self.match_type)
    }
}

/// Lines read from disk around a match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextWindow {
    pub start_line: usize,
    pub end_line: usize,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMatch {
    #[serde(flatten)]
    pub code_match: CodeMatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextWindow>,
}

impl EnrichedMatch {
    pub fn without_context(code_match: CodeMatch) -> Self {
        Self {
            code_match,
            context: None,
        }
    }

    /// Code to show: the disk window when it was read, otherwise the chunk text.
    pub fn display_code(&self) -> &str {
        self.context
            .as_ref()
            .map(|window| window.code.as_str())
            .unwrap_or(&self.code_match.code)
    }

    pub fn display_range(&self) -> (usize, usize) {
        match &self.context {
            Some(window) => (window.start_line, window.end_line),
            None => (self.code_match.line_start, self.code_match.line_end),
        }
    }
}

/// Marker returned when a stage observed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;
