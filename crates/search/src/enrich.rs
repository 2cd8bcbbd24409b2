use crate::types::{Cancelled, CodeMatch, ContextWindow, EnrichedMatch};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Source of file contents for context enrichment.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Full text of `path`, refusing files above `max_bytes`.
    async fn read(&self, path: &Path, max_bytes: u64) -> io::Result<String>;
}

/// Reads straight from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceReader;

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read(&self, path: &Path, max_bytes: u64) -> io::Result<String> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} bytes exceeds limit of {max_bytes}", metadata.len()),
            ));
        }
        // Non-UTF-8 content surfaces as InvalidData here.
        tokio::fs::read_to_string(path).await
    }
}

/// Widens matches with surrounding lines read from disk
pub struct ContextEnricher {
    max_file_bytes: u64,
    reader: Arc<dyn SourceReader>,
}

impl ContextEnricher {
    pub fn new(max_file_bytes: u64) -> Self {
        Self::with_reader(max_file_bytes, Arc::new(FsSourceReader))
    }

    pub fn with_reader(max_file_bytes: u64, reader: Arc<dyn SourceReader>) -> Self {
        Self {
            max_file_bytes,
            reader,
        }
    }

    /// Enriches matches one file at a time, preserving order.
    ///
    /// Read failures leave a match with its chunk text. Cancellation is checked before
    /// each file and discards everything enriched so far.
    pub async fn enrich(
        &self,
        matches: Vec<CodeMatch>,
        context_lines: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedMatch>, Cancelled> {
        let mut enriched = Vec::with_capacity(matches.len());

        for code_match in matches {
            if cancel.is_cancelled() {
                log::debug!("Enrichment cancelled after {} file(s)", enriched.len());
                return Err(Cancelled);
            }

            let context = match self
                .reader
                .read(Path::new(&code_match.file_path), self.max_file_bytes)
                .await
            {
                Ok(source) => context_window(&source, &code_match, context_lines),
                Err(err) => {
                    log::debug!(
                        "Keeping chunk text for {}: {err}",
                        code_match.relative_path
                    );
                    None
                }
            };

            enriched.push(EnrichedMatch {
                code_match,
                context,
            });
        }

        Ok(enriched)
    }
}

/// Lines `[line_start - context, line_end + context]` of `source`, clipped to the file.
/// `None` when the match lies past the end of the file.
fn context_window(source: &str, code_match: &CodeMatch, context_lines: usize) -> Option<ContextWindow> {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() || code_match.line_start > lines.len() {
        return None;
    }

    let start_line = code_match.line_start.saturating_sub(context_lines).max(1);
    let end_line = code_match
        .line_end
        .max(code_match.line_start)
        .saturating_add(context_lines)
        .min(lines.len());

    Some(ContextWindow {
        start_line,
        end_line,
        code: lines[start_line - 1..end_line].join("\n"),
    })
}
