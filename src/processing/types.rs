//! Core data types and error definitions for the summarization pipeline.

use crate::extraction::ExtractionError;
use anyhow::Error as TokenizerError;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The caller configured an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Model we attempted to load a tokenizer for.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Errors emitted by the summary service.
///
/// Model failures never appear here: the reducer absorbs them into sentinel or degraded results.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The PDF could not be found, read, or parsed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The request asked for an invalid chunk configuration.
    #[error("Invalid chunking request: {0}")]
    Chunking(#[from] ChunkingError),
    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of summarizing one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
    /// The model produced a summary.
    Summarized(String),
    /// The input was below the minimum length; no call was made.
    TooShort,
    /// The model call failed; carries the reason.
    Failed(String),
}

/// How the final summary of a document was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Several chunk summaries were reduced by one more model call.
    Reduced,
    /// Exactly one chunk summary existed and was returned verbatim.
    Single,
    /// The final reduction failed; chunk summaries were concatenated instead.
    Unreduced,
    /// The document was below the minimum length.
    TooShort,
    /// Chunking produced nothing to summarize.
    NoValidContent,
    /// Every chunk failed or was skipped.
    AllChunksFailed,
}

impl SummaryKind {
    /// Whether the summary text is a fixed sentinel message rather than model output.
    pub fn is_sentinel(self) -> bool {
        matches!(
            self,
            Self::TooShort | Self::NoValidContent | Self::AllChunksFailed
        )
    }
}

/// Per-document counters collected while summarizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    /// Number of chunks produced by the splitter.
    pub chunk_count: usize,
    /// Chunks that yielded a summary.
    pub summarized: usize,
    /// Chunks skipped for being too short.
    pub skipped: usize,
    /// Chunks whose model call failed.
    pub failed: usize,
}

/// Final summary of one invocation plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    /// The terminal summary text (model output, degraded concatenation, or sentinel).
    pub summary: String,
    /// Which exit path produced `summary`.
    pub kind: SummaryKind,
    /// Chunk-level counters.
    pub stats: SummaryStats,
}

/// Result of summarizing a document through [`crate::processing::SummaryService`].
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    /// Text the summary was computed from (extracted from the PDF when applicable).
    pub text: String,
    /// Effective chunk size used for this request.
    pub chunk_size: usize,
    /// The final summary and its provenance.
    pub outcome: SummaryOutcome,
}
