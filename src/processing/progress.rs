//! Progress reporting for the summarization pipeline.
//!
//! Progress is a fraction in `[0, 1]` plus a short description. The overall scale is shared by
//! every stage: extraction owns [`EXTRACTION_RANGE`], chunk summarization owns
//! [`CHUNK_SUMMARY_RANGE`], and the final reduction owns [`REDUCTION_RANGE`]. Sinks are purely
//! observational and must never block the pipeline.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Fraction reported when an invocation reaches its terminal state.
pub const TERMINAL_PROGRESS: f32 = 1.0;
/// Portion of the scale reserved for PDF text extraction.
pub const EXTRACTION_RANGE: ProgressRange = ProgressRange::new(0.0, 0.5);
/// Portion of the scale used while validating and chunking text.
pub const PREPARATION_RANGE: ProgressRange = ProgressRange::new(0.5, 0.65);
/// Portion of the scale used while summarizing individual chunks.
pub const CHUNK_SUMMARY_RANGE: ProgressRange = ProgressRange::new(0.65, 0.9);
/// Portion of the scale used by the final reduction.
pub const REDUCTION_RANGE: ProgressRange = ProgressRange::new(0.9, 1.0);

/// Consumer of progress updates.
pub trait ProgressSink: Send + Sync {
    /// Record that the pipeline reached `fraction` while doing `description`.
    fn report(&self, fraction: f32, description: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f32, &str) + Send + Sync,
{
    fn report(&self, fraction: f32, description: &str) {
        self(fraction, description)
    }
}

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Completed fraction in `[0, 1]`.
    pub fraction: f32,
    /// Human-readable stage description.
    pub description: String,
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _fraction: f32, _description: &str) {}
}

/// Sink that forwards updates to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, fraction: f32, description: &str) {
        tracing::debug!(fraction, description, "Summarization progress");
    }
}

/// Sink that forwards updates over an unbounded channel, e.g. to a streaming response.
///
/// Sending never blocks; updates are silently dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    /// Wrap the sending half of a channel.
    pub fn new(sender: UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, fraction: f32, description: &str) {
        let _ = self.sender.send(ProgressUpdate {
            fraction,
            description: description.to_string(),
        });
    }
}

/// Guard that keeps reported fractions inside `[0, 1]` and never lets them go backwards.
///
/// Updates that would regress are forwarded at the previous high-water mark, so a sink always
/// observes a non-decreasing sequence even when producers complete out of order.
pub struct MonotonicProgress<'a> {
    inner: &'a dyn ProgressSink,
    high_water: Mutex<f32>,
}

impl<'a> MonotonicProgress<'a> {
    /// Wrap `inner`, starting from zero.
    pub fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            high_water: Mutex::new(0.0),
        }
    }

    /// Highest fraction reported so far.
    pub fn current(&self) -> f32 {
        match self.high_water.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl ProgressSink for MonotonicProgress<'_> {
    fn report(&self, fraction: f32, description: &str) {
        let requested = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, TERMINAL_PROGRESS)
        };
        let mut high_water = match self.high_water.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let effective = requested.max(*high_water);
        *high_water = effective;
        // Forward while holding the lock so concurrent reporters cannot interleave out of order.
        self.inner.report(effective, description);
    }
}

/// A sub-interval of the overall progress scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    /// Fraction at which the stage begins.
    pub start: f32,
    /// Fraction at which the stage ends.
    pub end: f32,
}

impl ProgressRange {
    /// Create a range from `start` to `end`.
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Linearly interpolate the fraction for `completed` of `total` steps.
    pub fn at(&self, completed: usize, total: usize) -> f32 {
        if total == 0 || completed >= total {
            return self.end;
        }
        let ratio = completed as f32 / total as f32;
        self.start + (self.end - self.start) * ratio
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{ProgressSink, ProgressUpdate};
    use std::sync::Mutex;

    /// Test sink that records every update.
    #[derive(Default)]
    pub(crate) struct RecordingProgress {
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl RecordingProgress {
        pub(crate) fn updates(&self) -> Vec<ProgressUpdate> {
            self.updates.lock().expect("progress lock").clone()
        }

        pub(crate) fn fractions(&self) -> Vec<f32> {
            self.updates().into_iter().map(|u| u.fraction).collect()
        }

        pub(crate) fn assert_monotonic_and_terminal(&self) {
            let fractions = self.fractions();
            assert!(!fractions.is_empty(), "no progress reported");
            for pair in fractions.windows(2) {
                assert!(pair[0] <= pair[1], "progress regressed: {fractions:?}");
            }
            assert_eq!(fractions.last().copied(), Some(super::TERMINAL_PROGRESS));
        }
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, fraction: f32, description: &str) {
            self.updates.lock().expect("progress lock").push(ProgressUpdate {
                fraction,
                description: description.to_string(),
            });
        }
    }
}
