//! Hierarchical map-reduce summarization over document chunks.
//!
//! Each chunk is summarized independently, then the chunk summaries are joined with a blank line
//! and summarized once more. Chunk failures are logged and dropped; a failed final reduction falls
//! back to the labelled concatenation of chunk summaries. Every invocation ends with exactly one
//! final summary and a terminal progress report.

use futures_util::{StreamExt, pin_mut, stream};

use super::chunking::{LengthFn, chunk_text};
use super::client::Summarizer;
use super::progress::{
    CHUNK_SUMMARY_RANGE, MonotonicProgress, PREPARATION_RANGE, ProgressSink, REDUCTION_RANGE,
    TERMINAL_PROGRESS,
};
use super::types::{SummaryKind, SummaryOutcome, SummaryResult, SummaryStats};

/// Returned when the document is below the minimum length.
pub const TOO_SHORT_MESSAGE: &str = "The text is too short to summarize.";
/// Returned when chunking produced nothing to summarize.
pub const NO_VALID_CONTENT_MESSAGE: &str = "No text to summarize.";
/// Returned when every chunk failed or was skipped.
pub const ALL_CHUNKS_FAILED_MESSAGE: &str =
    "Unable to generate a summary. Please check your inputs and try again.";
/// Heading placed before chunk summaries that could not be condensed further.
pub const UNREDUCED_PREFIX: &str = "Combined section summaries (not condensed further):\n\n";

const SUMMARY_SEPARATOR: &str = "\n\n";

/// Tunables for [`HierarchicalReducer`].
#[derive(Clone)]
pub struct ReducerSettings {
    /// Overlap between adjacent chunks, in length units.
    pub chunk_overlap: usize,
    /// Chunks whose trimmed character length is below this are skipped without a model call.
    pub min_chunk_chars: usize,
    /// Documents whose trimmed character length is below this are not chunked at all.
    pub min_document_chars: usize,
    /// Maximum chunk summaries in flight. Values below one are treated as one.
    pub concurrency: usize,
    /// Length function used by the splitter.
    pub length: LengthFn,
}

impl Default for ReducerSettings {
    fn default() -> Self {
        Self {
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
            min_chunk_chars: crate::config::DEFAULT_MIN_CHUNK_CHARS,
            min_document_chars: crate::config::DEFAULT_MIN_DOCUMENT_CHARS,
            concurrency: 1,
            length: super::chunking::character_counter(),
        }
    }
}

enum ChunkStep {
    Summary(String),
    Skipped,
    Failed(String),
}

/// Summarizes arbitrarily long text in two levels.
#[derive(Clone)]
pub struct HierarchicalReducer {
    summarizer: Summarizer,
    settings: ReducerSettings,
}

impl HierarchicalReducer {
    /// Create a reducer around `summarizer`.
    pub fn new(summarizer: Summarizer, settings: ReducerSettings) -> Self {
        Self {
            summarizer,
            settings,
        }
    }

    /// Summarize `text` and return only the final summary string.
    ///
    /// Never fails: degraded results and sentinels are returned as text.
    pub async fn summarize_long(
        &self,
        text: &str,
        max_chunk_size: usize,
        progress: &dyn ProgressSink,
    ) -> String {
        self.summarize_document(text, max_chunk_size, progress)
            .await
            .summary
    }

    /// Summarize `text`, reporting how the final summary was reached.
    pub async fn summarize_document(
        &self,
        text: &str,
        max_chunk_size: usize,
        progress: &dyn ProgressSink,
    ) -> SummaryOutcome {
        let progress = MonotonicProgress::new(progress);
        progress.report(PREPARATION_RANGE.start, "Validating text");

        if text.trim().chars().count() < self.settings.min_document_chars {
            tracing::info!(
                min_chars = self.settings.min_document_chars,
                "Text below minimum length; skipping summarization"
            );
            return finish(
                &progress,
                TOO_SHORT_MESSAGE.to_string(),
                SummaryKind::TooShort,
                SummaryStats::default(),
            );
        }

        let chunks = match chunk_text(
            text,
            max_chunk_size.max(1),
            self.settings.chunk_overlap,
            self.settings.length.clone(),
        ) {
            Ok(chunks) => chunks,
            Err(error) => {
                tracing::warn!(error = %error, "Chunking failed");
                Vec::new()
            }
        };
        let mut stats = SummaryStats {
            chunk_count: chunks.len(),
            ..SummaryStats::default()
        };
        if chunks.is_empty() {
            return finish(
                &progress,
                NO_VALID_CONTENT_MESSAGE.to_string(),
                SummaryKind::NoValidContent,
                stats,
            );
        }
        tracing::debug!(chunks = chunks.len(), max_chunk_size, "Split text into chunks");
        progress.report(
            CHUNK_SUMMARY_RANGE.start,
            &format!("Split text into {} chunks", chunks.len()),
        );

        let summaries = self.summarize_chunks(&chunks, &progress, &mut stats).await;

        match summaries.len() {
            0 => {
                tracing::warn!(
                    chunks = stats.chunk_count,
                    failed = stats.failed,
                    skipped = stats.skipped,
                    "No chunk produced a summary"
                );
                finish(
                    &progress,
                    ALL_CHUNKS_FAILED_MESSAGE.to_string(),
                    SummaryKind::AllChunksFailed,
                    stats,
                )
            }
            1 => {
                let single = summaries.into_iter().next().unwrap_or_default();
                finish(&progress, single, SummaryKind::Single, stats)
            }
            count => {
                progress.report(
                    REDUCTION_RANGE.start,
                    &format!("Combining {count} chunk summaries"),
                );
                let combined = summaries.join(SUMMARY_SEPARATOR);
                match self.summarizer.summarize(&combined).await {
                    SummaryResult::Summarized(summary) => {
                        finish(&progress, summary, SummaryKind::Reduced, stats)
                    }
                    SummaryResult::Failed(reason) => {
                        tracing::warn!(
                            reason = %reason,
                            "Final reduction failed; returning combined chunk summaries"
                        );
                        finish(
                            &progress,
                            format!("{UNREDUCED_PREFIX}{combined}"),
                            SummaryKind::Unreduced,
                            stats,
                        )
                    }
                    SummaryResult::TooShort => {
                        tracing::debug!("Combined summaries too short to reduce further");
                        finish(
                            &progress,
                            format!("{UNREDUCED_PREFIX}{combined}"),
                            SummaryKind::Unreduced,
                            stats,
                        )
                    }
                }
            }
        }
    }

    async fn summarize_chunks(
        &self,
        chunks: &[String],
        progress: &dyn ProgressSink,
        stats: &mut SummaryStats,
    ) -> Vec<String> {
        let total = chunks.len();
        let min_chars = self.settings.min_chunk_chars;
        let steps = stream::iter(0..total)
            .map(|index| {
                let chunk = chunks[index].as_str();
                async move {
                    if chunk.trim().chars().count() < min_chars {
                        return (index, ChunkStep::Skipped);
                    }
                    let step = match self.summarizer.summarize(chunk).await {
                        SummaryResult::Summarized(summary) => ChunkStep::Summary(summary),
                        SummaryResult::TooShort => ChunkStep::Skipped,
                        SummaryResult::Failed(reason) => ChunkStep::Failed(reason),
                    };
                    (index, step)
                }
            })
            .buffered(self.settings.concurrency.max(1));
        pin_mut!(steps);

        let mut summaries = Vec::with_capacity(total);
        let mut completed = 0;
        while let Some((index, step)) = steps.next().await {
            completed += 1;
            match step {
                ChunkStep::Summary(summary) => {
                    stats.summarized += 1;
                    summaries.push(summary);
                }
                ChunkStep::Skipped => {
                    stats.skipped += 1;
                    tracing::debug!(chunk = index + 1, "Skipping chunk below minimum length");
                }
                ChunkStep::Failed(reason) => {
                    stats.failed += 1;
                    tracing::warn!(
                        chunk = index + 1,
                        total,
                        reason = %reason,
                        "Chunk summarization failed; continuing"
                    );
                }
            }
            progress.report(
                CHUNK_SUMMARY_RANGE.at(completed, total),
                &format!("Summarized chunk {completed}/{total}"),
            );
        }
        summaries
    }
}

fn finish(
    progress: &MonotonicProgress<'_>,
    summary: String,
    kind: SummaryKind,
    stats: SummaryStats,
) -> SummaryOutcome {
    progress.report(TERMINAL_PROGRESS, "Summary complete");
    SummaryOutcome {
        summary,
        kind,
        stats,
    }
}
