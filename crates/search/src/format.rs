use crate::engine::{RetrievalOutcome, RetrievalReport};
use crate::error::SearchError;
use crate::types::{EnrichedMatch, MatchType};
use std::fmt::Write;

/// Plain-text rendering of retrieval outcomes.
pub struct ResultFormatter {
    max_lines: usize,
}

impl ResultFormatter {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    pub fn render(&self, outcome: &RetrievalOutcome) -> String {
        match outcome {
            RetrievalOutcome::Ready(report) => self.render_report(report),
            RetrievalOutcome::IndexNotReady {
                workspace_id,
                triggered: true,
                ..
            } => format!(
                "Workspace {workspace_id} has no vector index yet. Indexing has been started; \
                 run the search again once it finishes."
            ),
            RetrievalOutcome::IndexNotReady { workspace_id, .. } => format!(
                "Workspace {workspace_id} is still being indexed. Try again in a moment."
            ),
            RetrievalOutcome::Cancelled { stage } => format!("Search cancelled ({stage})."),
        }
    }

    pub fn render_error(&self, err: &SearchError) -> String {
        format!("Error: {err}\nHint: {}", err.hint())
    }

    fn render_report(&self, report: &RetrievalReport) -> String {
        let mut out = String::new();
        if report.matches.is_empty() {
            let _ = writeln!(
                out,
                "No matches for \"{}\" ({} ms).\nTry a broader query, another focus, or drop the scope.",
                report.query, report.elapsed_ms
            );
            return out;
        }

        let _ = writeln!(
            out,
            "Results for \"{}\": {} match(es) in {} ms",
            report.query,
            report.matches.len(),
            report.elapsed_ms
        );
        for (rank, item) in report.matches.iter().enumerate() {
            out.push('\n');
            self.render_match(&mut out, rank + 1, item);
        }
        out
    }

    fn render_match(&self, out: &mut String, rank: usize, item: &EnrichedMatch) {
        let code_match = &item.code_match;
        let (start, end) = item.display_range();
        let _ = write!(
            out,
            "{rank}. {}:{start}-{end} (score {:.0}%)",
            code_match.relative_path,
            code_match.score * 100.0
        );
        if code_match.match_type == MatchType::Structural {
            if let (Some(kind), Some(name)) = (code_match.symbol_kind, &code_match.symbol_name) {
                let _ = write!(out, " [{kind}: {name}]");
            }
        }
        out.push('\n');

        let lines: Vec<&str> = item.display_code().lines().collect();
        let _ = writeln!(out, "```{}", fence_language(&code_match.language));
        for line in lines.iter().take(self.max_lines) {
            let _ = writeln!(out, "{line}");
        }
        if lines.len() > self.max_lines {
            let _ = writeln!(out, "... ({} more lines)", lines.len() - self.max_lines);
        }
        out.push_str("```\n");
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(20)
    }
}

fn fence_language(language: &str) -> &str {
    if language == "unknown" {
        ""
    } else {
        language
    }
}
