use crate::structural::StructuralMatcher;
use crate::tokenizer::QueryTerms;
use crate::types::{Cancelled, CodeMatch};
use scout_protocol::{Focus, SemanticChunk};
use std::cmp::Ordering;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Combines semantic chunks with the declarations found inside them
pub struct ResultFusionEngine {
    boost: f32,
}

impl ResultFusionEngine {
    pub fn new(boost: f32) -> Self {
        Self { boost }
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Turns chunks into candidate matches.
    ///
    /// Every chunk yields a semantic match. Only the first chunk seen for each file is
    /// scanned structurally; its declarations follow its semantic match in the output.
    pub fn collect(
        &self,
        chunks: &[SemanticChunk],
        focus: Focus,
        terms: &QueryTerms,
        matcher: &StructuralMatcher,
        cancel: &CancellationToken,
    ) -> Result<Vec<CodeMatch>, Cancelled> {
        let mut scanned_paths: HashSet<&str> = HashSet::new();
        let mut matches = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            matches.push(CodeMatch::semantic(chunk));

            if !scanned_paths.insert(chunk.relative_path.as_str()) {
                continue;
            }
            let candidates = matcher.find(&chunk.content, focus, terms, cancel)?;
            log::trace!(
                "{}: {} structural candidate(s)",
                chunk.relative_path,
                candidates.len()
            );
            matches.extend(
                candidates
                    .iter()
                    .map(|candidate| CodeMatch::structural(chunk, candidate, self.boost)),
            );
        }

        Ok(matches)
    }

    /// Drops repeated (path, line, kind) keys keeping the first, orders by score
    /// descending with ties in arrival order, and keeps at most `limit` matches.
    pub fn merge(&self, matches: Vec<CodeMatch>, limit: usize) -> Vec<CodeMatch> {
        let mut seen = HashSet::new();
        let mut merged: Vec<CodeMatch> = matches
            .into_iter()
            .filter(|candidate| seen.insert(candidate.key()))
            .collect();

        merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        merged.truncate(limit);
        merged
    }
}

impl Default for ResultFusionEngine {
    fn default() -> Self {
        Self::new(1.2)
    }
}
