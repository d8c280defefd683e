use crate::processing::{SummaryKind, SummaryOutcome};
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    documents_summarized: AtomicU64,
    chunks_processed: AtomicU64,
    chunk_summaries: AtomicU64,
    chunk_failures: AtomicU64,
    reduction_fallbacks: AtomicU64,
    last_chunk_size: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished summarization and the chunk size it used.
    pub fn record_outcome(&self, outcome: &SummaryOutcome, chunk_size: usize) {
        let stats = outcome.stats;
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_processed
            .fetch_add(stats.chunk_count as u64, Ordering::Relaxed);
        self.chunk_summaries
            .fetch_add(stats.summarized as u64, Ordering::Relaxed);
        self.chunk_failures
            .fetch_add(stats.failed as u64, Ordering::Relaxed);
        if outcome.kind == SummaryKind::Unreduced {
            self.reduction_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        self.last_chunk_size
            .store(chunk_size as u64, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_chunk_size = self.last_chunk_size.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            chunk_summaries: self.chunk_summaries.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
            reduction_fallbacks: self.reduction_fallbacks.load(Ordering::Relaxed),
            last_chunk_size: (last_chunk_size > 0).then_some(last_chunk_size),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents (or raw texts) summarized since startup, including sentinel outcomes.
    pub documents_summarized: u64,
    /// Total chunks produced across all documents.
    pub chunks_processed: u64,
    /// Chunk summaries returned by the model.
    pub chunk_summaries: u64,
    /// Chunk summarization calls that failed.
    pub chunk_failures: u64,
    /// Final reductions that fell back to concatenated chunk summaries.
    pub reduction_fallbacks: u64,
    /// Chunk size used by the most recent request, if any.
    pub last_chunk_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::SummaryStats;

    fn outcome(kind: SummaryKind, chunk_count: usize, summarized: usize, failed: usize) -> SummaryOutcome {
        SummaryOutcome {
            summary: "summary".into(),
            kind,
            stats: SummaryStats {
                chunk_count,
                summarized,
                skipped: chunk_count - summarized - failed,
                failed,
            },
        }
    }

    #[test]
    fn records_outcomes() {
        let metrics = SummaryMetrics::new();
        metrics.record_outcome(&outcome(SummaryKind::Reduced, 3, 2, 1), 4000);
        metrics.record_outcome(&outcome(SummaryKind::Unreduced, 2, 2, 0), 1024);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_summarized, 2);
        assert_eq!(snapshot.chunks_processed, 5);
        assert_eq!(snapshot.chunk_summaries, 4);
        assert_eq!(snapshot.chunk_failures, 1);
        assert_eq!(snapshot.reduction_fallbacks, 1);
        assert_eq!(snapshot.last_chunk_size, Some(1024));
    }

    #[test]
    fn empty_snapshot_has_no_chunk_size() {
        let metrics = SummaryMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
