//! Summarization pipeline: chunking, per-chunk summaries, hierarchical reduction, and progress.

pub mod chunking;
pub mod client;
pub mod progress;
pub mod reducer;
mod service;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;

pub use client::Summarizer;
pub use progress::{
    ChannelProgress, MonotonicProgress, NoopProgress, ProgressSink, ProgressUpdate,
    TracingProgress,
};
pub use reducer::{HierarchicalReducer, ReducerSettings};
pub use service::{SummaryApi, SummaryService};
pub use types::{
    ChunkingError, DocumentSummary, ProcessingError, SummaryKind, SummaryOutcome, SummaryResult,
    SummaryStats,
};
