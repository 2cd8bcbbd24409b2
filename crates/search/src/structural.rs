use crate::config::RetrievalConfig;
use crate::patterns::{is_control_flow_keyword, pattern_table, PatternTable, StructuralPattern};
use crate::tokenizer::QueryTerms;
use crate::types::{Cancelled, StructuralCandidate};
use scout_protocol::Focus;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Finds declarations in a chunk and keeps those whose surroundings mention the query.
pub struct StructuralMatcher {
    table: &'static PatternTable,
    window_before: usize,
    window_after: usize,
}

impl StructuralMatcher {
    pub fn new(window_before: usize, window_after: usize) -> Self {
        Self {
            table: pattern_table(),
            window_before,
            window_after,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.window_before, config.window_after)
    }

    /// Relevant candidates only. Cancellation is checked before every pattern.
    pub fn find(
        &self,
        text: &str,
        focus: Focus,
        terms: &QueryTerms,
        cancel: &CancellationToken,
    ) -> Result<Vec<StructuralCandidate>, Cancelled> {
        let mut candidates = self.scan(text, focus, terms, cancel)?;
        candidates.retain(|candidate| candidate.relevant);
        Ok(candidates)
    }

    /// Every declaration the table recognizes, each tagged with its relevance.
    pub fn scan(
        &self,
        text: &str,
        focus: Focus,
        terms: &QueryTerms,
        cancel: &CancellationToken,
    ) -> Result<Vec<StructuralCandidate>, Cancelled> {
        let lines = ChunkLines::new(text);
        let mut candidates = Vec::new();

        for pattern in self.table.select(focus) {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            self.scan_pattern(pattern, text, &lines, terms, &mut candidates);
        }

        // Several rows of one category can recognize the same declaration.
        let mut seen = HashSet::new();
        candidates.retain(|candidate| seen.insert((candidate.line_offset, candidate.kind)));

        Ok(candidates)
    }

    fn scan_pattern(
        &self,
        pattern: &StructuralPattern,
        text: &str,
        lines: &ChunkLines<'_>,
        terms: &QueryTerms,
        out: &mut Vec<StructuralCandidate>,
    ) {
        for captures in pattern.regex.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let symbol_name = captures
                .get(1)
                .map(|group| group.as_str().trim())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| whole.as_str().trim())
                .to_string();

            if pattern.rejects_keywords && is_control_flow_keyword(&symbol_name) {
                continue;
            }

            // Anchor on the name: patterns may consume leading blank lines or test attributes.
            let anchor = captures.get(1).map_or(whole.start(), |group| group.start());
            let line = lines.line_of(anchor);
            let (window_start, window_end) = lines.window(line, self.window_before, self.window_after);
            let window = lines.slice(window_start, window_end).to_lowercase();

            out.push(StructuralCandidate {
                symbol_name,
                kind: pattern.category,
                line_offset: line,
                window_end,
                relevant: terms.any_within(&window),
            });
        }
    }
}

/// Line index over a chunk: byte offsets where each line starts.
struct ChunkLines<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> ChunkLines<'a> {
    fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { text, starts }
    }

    fn count(&self) -> usize {
        self.starts.len()
    }

    /// 1-indexed line containing `offset`: one plus the newlines before it.
    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|start| *start <= offset)
    }

    /// Inclusive 1-indexed window clamped to the chunk.
    fn window(&self, line: usize, before: usize, after: usize) -> (usize, usize) {
        let start = line.saturating_sub(before).max(1);
        let end = line.saturating_add(after).min(self.count());
        (start, end)
    }

    fn slice(&self, first: usize, last: usize) -> &'a str {
        let begin = self.starts[first - 1];
        let end = self
            .starts
            .get(last)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        &self.text[begin..end]
    }
}
