//! Chunked examination of long text context.
//!
//! Long history is never sent whole to a single model call. It is cut into
//! overlapping windows, every window is judged on its own, and only the
//! highest-confidence windows are stitched back together.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, warn};

use rvla_config::ContextConfig;
use rvla_protocols::error::ExaminerError;
use rvla_protocols::examiner::{SnippetExaminer, TextExamination};
use rvla_protocols::types::ContextSnippet;

const SNIPPET_SEPARATOR: &str = "\n\n---\n\n";

/// Character windows over a text of `len` characters.
///
/// Consecutive windows start `chunk_size - overlap` apart and the last one
/// always ends at `len`, so a text longer than `chunk_size` yields
/// `ceil((len - overlap) / (chunk_size - overlap))` windows. A text of at
/// most `chunk_size` characters yields one window.
pub fn chunk_windows(
    len: usize,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Range<usize>>, ExaminerError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ExaminerError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }

    let stride = chunk_size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }
    Ok(windows)
}

/// Slice `text` into snippets along character windows.
pub fn split_snippets(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<ContextSnippet>, ExaminerError> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let snippets = chunk_windows(char_len, chunk_size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(chunk_id, window)| ContextSnippet {
            content: text[boundaries[window.start]..boundaries[window.end]].to_string(),
            start: window.start,
            end: window.end,
            chunk_id,
        })
        .collect();
    Ok(snippets)
}

/// Result of examining a context.
#[derive(Debug, Clone, PartialEq)]
pub enum Examination {
    /// The context fit in one window and was judged whole.
    Direct(TextExamination),
    /// The context was chunked and the best windows combined.
    Chunked(ChunkedExamination),
}

impl Examination {
    /// Text standing in for the examined context.
    pub fn summary(&self) -> &str {
        match self {
            Self::Direct(exam) => &exam.summary,
            Self::Chunked(chunked) => &chunked.combined_content,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

/// Outcome of windowed examination.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedExamination {
    pub total_snippets: usize,
    pub relevant_snippets: usize,
    /// Selected windows tagged `[Snippet start-end]`, in rank order.
    pub combined_content: String,
    /// Character ranges of the selected windows, in rank order.
    pub snippet_indices: Vec<(usize, usize)>,
    /// Per-window verdicts of the selected windows, in rank order.
    pub findings: Vec<TextExamination>,
}

/// Context Examiner.
pub struct ContextExaminer {
    examiner: Arc<dyn SnippetExaminer>,
    chunk_size: usize,
    overlap: usize,
    top_k: usize,
}

impl ContextExaminer {
    pub fn new(examiner: Arc<dyn SnippetExaminer>, config: &ContextConfig) -> Self {
        Self {
            examiner,
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            top_k: config.top_k,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Examine `context` against `query`.
    ///
    /// Contexts of at most `chunk_size` characters (including the empty
    /// string) are examined directly as a single snippet.
    pub async fn examine(
        &self,
        context: &str,
        query: &str,
        goal: &str,
    ) -> Result<Examination, ExaminerError> {
        if context.chars().count() <= self.chunk_size {
            let snippet = ContextSnippet::whole(context);
            let exam = self.examiner.examine_text(&snippet, query, goal).await?;
            return Ok(Examination::Direct(exam));
        }

        let chunked = self
            .process_context_recursively(context, goal, query, self.chunk_size, self.overlap)
            .await?;
        Ok(Examination::Chunked(chunked))
    }

    /// Window the context, judge every window and combine the top-ranked ones.
    ///
    /// A window whose examination fails is left out of the ranking; the call
    /// only fails when no window could be examined at all.
    pub async fn process_context_recursively(
        &self,
        context: &str,
        goal: &str,
        query: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<ChunkedExamination, ExaminerError> {
        let snippets = split_snippets(context, chunk_size, overlap)?;
        let total_snippets = snippets.len();
        debug!("Examining {} context windows", total_snippets);

        let mut ranked: Vec<(ContextSnippet, TextExamination)> = Vec::with_capacity(total_snippets);
        let mut last_error = None;
        for snippet in snippets {
            match self.examiner.examine_text(&snippet, query, goal).await {
                Ok(exam) => ranked.push((snippet, exam)),
                Err(e) => {
                    warn!(
                        "Window {} ({}-{}) examination failed: {}",
                        snippet.chunk_id, snippet.start, snippet.end, e
                    );
                    last_error = Some(e);
                }
            }
        }

        if ranked.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        // Stable: equal confidence keeps window order.
        ranked.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
        ranked.truncate(self.top_k);

        let combined_content = ranked
            .iter()
            .map(|(s, _)| format!("[Snippet {}-{}]\n{}", s.start, s.end, s.content))
            .collect::<Vec<_>>()
            .join(SNIPPET_SEPARATOR);
        let snippet_indices = ranked.iter().map(|(s, _)| (s.start, s.end)).collect();
        let relevant_snippets = ranked.len();
        let findings = ranked.into_iter().map(|(_, exam)| exam).collect();

        Ok(ChunkedExamination {
            total_snippets,
            relevant_snippets,
            combined_content,
            snippet_indices,
            findings,
        })
    }

    /// Ask a question of the context and return only the answer text.
    pub async fn query_context(
        &self,
        context: &str,
        question: &str,
        goal: &str,
    ) -> Result<String, ExaminerError> {
        let examination = self.examine(context, question, goal).await?;
        Ok(examination.summary().to_string())
    }
}

#[cfg(test)]
#[path = "context_examiner_tests.rs"]
mod tests;
