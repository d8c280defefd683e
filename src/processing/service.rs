//! Summary service: the single entry point the HTTP API and the CLI call into.

use crate::{
    config::{ConfigError, SummarizerSettings},
    extraction::{extract_pages, join_pages, read_pdf},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        chunking::{build_length_fn, determine_chunk_size},
        client::Summarizer,
        progress::{EXTRACTION_RANGE, MonotonicProgress, ProgressSink},
        reducer::{HierarchicalReducer, ReducerSettings},
        types::{ChunkingError, DocumentSummary, ProcessingError},
    },
    summarization::{LanguageModel, build_language_model},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Coordinates extraction, chunking, and hierarchical summarization.
///
/// The service owns the language model handle, the reducer, and the metrics registry so that the
/// HTTP surface and the CLI share the same pipeline. Construct it once and share it through an
/// `Arc`.
pub struct SummaryService {
    reducer: HierarchicalReducer,
    settings: SummarizerSettings,
    model_label: String,
    metrics: Arc<SummaryMetrics>,
}

/// Abstraction over the summary pipeline used by external surfaces.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Summarize raw text.
    async fn summarize_text(
        &self,
        text: String,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError>;

    /// Extract text from an uploaded PDF and summarize it.
    async fn summarize_pdf_bytes(
        &self,
        source_name: String,
        bytes: Vec<u8>,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryService {
    /// Build a service, constructing the language model selected by `settings`.
    pub fn new(settings: SummarizerSettings) -> Result<Self, ConfigError> {
        let model = build_language_model(&settings)?;
        Ok(Self::with_model(settings, model))
    }

    /// Build a service around an existing language model.
    pub fn with_model(settings: SummarizerSettings, model: Arc<dyn LanguageModel>) -> Self {
        let summarizer = Summarizer::new(model)
            .with_min_chars(settings.min_chunk_chars)
            .with_timeout(settings.request_timeout);
        let model_label = summarizer.describe();
        let reducer = HierarchicalReducer::new(
            summarizer,
            ReducerSettings {
                chunk_overlap: settings.chunk_overlap,
                min_chunk_chars: settings.min_chunk_chars,
                min_document_chars: settings.min_document_chars,
                concurrency: settings.concurrency,
                length: build_length_fn(settings.length_unit, &settings.model),
            },
        );
        tracing::info!(
            model = %model_label,
            length_unit = ?settings.length_unit,
            concurrency = settings.concurrency,
            "Summary service ready"
        );
        Self {
            reducer,
            settings,
            model_label,
            metrics: Arc::new(SummaryMetrics::new()),
        }
    }

    /// Extract the PDF at `path` and summarize its text.
    pub async fn process_pdf(
        &self,
        path: impl AsRef<Path>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let source_name = path.display().to_string();
        tracing::info!(path = %source_name, "Processing PDF");
        let progress = MonotonicProgress::new(progress);
        progress.report(EXTRACTION_RANGE.start, "Reading PDF");

        let pages = tokio::task::spawn_blocking(move || {
            let bytes = read_pdf(&path)?;
            extract_pages(&bytes, &source_name)
        })
        .await??;
        let text = join_pages(&pages, &progress);
        self.summarize_extracted(text, None, &progress).await
    }

    /// Summarize `text`, optionally overriding the configured chunk size.
    pub async fn summarize_text(
        &self,
        text: String,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        let progress = MonotonicProgress::new(progress);
        self.summarize_extracted(text, chunk_size, &progress).await
    }

    /// Extract an in-memory PDF and summarize it.
    pub async fn summarize_pdf_bytes(
        &self,
        source_name: String,
        bytes: Vec<u8>,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        let chunk_size = self.resolve_chunk_size(chunk_size)?;
        tracing::info!(source = %source_name, bytes = bytes.len(), "Processing uploaded PDF");
        let progress = MonotonicProgress::new(progress);
        progress.report(EXTRACTION_RANGE.start, "Reading PDF");

        let pages =
            tokio::task::spawn_blocking(move || extract_pages(&bytes, &source_name)).await??;
        let text = join_pages(&pages, &progress);
        self.summarize_extracted(text, Some(chunk_size), &progress).await
    }

    /// Return the effective chunk size for a request.
    pub fn resolve_chunk_size(&self, requested: Option<usize>) -> Result<usize, ChunkingError> {
        if requested == Some(0) {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(determine_chunk_size(
            requested.or(self.settings.chunk_size),
            self.settings.length_unit,
            &self.settings.model,
        ))
    }

    /// Label of the language model behind this service.
    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    /// Retrieve the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn summarize_extracted(
        &self,
        text: String,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        let chunk_size = self.resolve_chunk_size(chunk_size)?;
        tracing::debug!(
            chunk_size,
            configured = ?self.settings.chunk_size,
            overlap = self.settings.chunk_overlap,
            chars = text.chars().count(),
            "Derived chunk size"
        );

        let outcome = self
            .reducer
            .summarize_document(&text, chunk_size, progress)
            .await;
        self.metrics.record_outcome(&outcome, chunk_size);
        tracing::info!(
            model = %self.model_label,
            kind = ?outcome.kind,
            chunks = outcome.stats.chunk_count,
            summarized = outcome.stats.summarized,
            failed = outcome.stats.failed,
            "Summarization complete"
        );

        Ok(DocumentSummary {
            text,
            chunk_size,
            outcome,
        })
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize_text(
        &self,
        text: String,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        SummaryService::summarize_text(self, text, chunk_size, progress).await
    }

    async fn summarize_pdf_bytes(
        &self,
        source_name: String,
        bytes: Vec<u8>,
        chunk_size: Option<usize>,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentSummary, ProcessingError> {
        SummaryService::summarize_pdf_bytes(self, source_name, bytes, chunk_size, progress).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionError;
    use crate::processing::progress::NoopProgress;
    use crate::processing::progress::recording::RecordingProgress;
    use crate::processing::test_support::ScriptedModel;
    use crate::processing::types::SummaryKind;
    use crate::summarization::RemoteModelError;

    fn service(model: Arc<ScriptedModel>) -> SummaryService {
        SummaryService::with_model(SummarizerSettings::default(), model)
    }

    fn long_text() -> String {
        "The committee reviewed the annual budget and approved new funding for research. ".repeat(4)
    }

    #[tokio::test]
    async fn summarize_text_returns_text_and_summary() {
        let model = ScriptedModel::replying("Budget approved with research funding.");
        let service = service(model.clone());
        let progress = RecordingProgress::default();

        let result = service
            .summarize_text(long_text(), None, &progress)
            .await
            .expect("summary");

        assert_eq!(result.text, long_text());
        assert_eq!(result.chunk_size, 4000);
        assert_eq!(result.outcome.kind, SummaryKind::Single);
        assert_eq!(result.outcome.summary, "Budget approved with research funding.");
        assert_eq!(model.call_count(), 1);
        progress.assert_monotonic_and_terminal();

        let metrics = service.metrics_snapshot();
        assert_eq!(metrics.documents_summarized, 1);
        assert_eq!(metrics.chunk_summaries, 1);
        assert_eq!(metrics.last_chunk_size, Some(4000));
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let service = service(ScriptedModel::replying("unused"));

        let error = service
            .summarize_text(long_text(), Some(0), &NoopProgress)
            .await
            .expect_err("invalid chunk size");

        assert!(matches!(
            error,
            ProcessingError::Chunking(ChunkingError::InvalidChunkSize)
        ));
    }

    #[tokio::test]
    async fn missing_pdf_is_reported_as_not_found() {
        let service = service(ScriptedModel::replying("unused"));

        let error = service
            .process_pdf("missing/report.pdf", &NoopProgress)
            .await
            .expect_err("missing file");

        assert!(matches!(
            error,
            ProcessingError::Extraction(ExtractionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_upload_is_reported() {
        let model = ScriptedModel::replying("unused");
        let service = service(model.clone());

        let error = service
            .summarize_pdf_bytes("notes.pdf".into(), b"plain text".to_vec(), None, &NoopProgress)
            .await
            .expect_err("malformed");

        assert!(matches!(
            error,
            ProcessingError::Extraction(ExtractionError::Malformed { .. })
        ));
        assert_eq!(model.call_count(), 0);
    }

    fn section_reply(prompt: &str) -> Result<String, RemoteModelError> {
        if prompt.contains("Digest of section") {
            return Ok("Every section reported steady growth.".into());
        }
        for name in ["alpha", "beta", "gamma"] {
            if prompt.contains(&format!("Section {name} ")) {
                return Ok(format!("Digest of section {name}: growth was steady this quarter."));
            }
        }
        Err(RemoteModelError::Generation("unexpected prompt".into()))
    }

    fn sections() -> String {
        ["alpha", "beta", "gamma"]
            .iter()
            .map(|name| {
                format!("Section {name} describes the quarterly results and lists the main findings.")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn concurrent_service_runs_on_spawned_tasks_through_the_api_trait() {
        let model = ScriptedModel::new(section_reply);
        let settings = SummarizerSettings {
            chunk_overlap: 0,
            concurrency: 3,
            ..SummarizerSettings::default()
        };
        let api: Arc<dyn SummaryApi> = Arc::new(SummaryService::with_model(settings, model.clone()));

        let handle = tokio::spawn({
            let api = Arc::clone(&api);
            async move { api.summarize_text(sections(), Some(100), &NoopProgress).await }
        });
        let result = handle.await.expect("task joined").expect("summary");

        assert_eq!(result.outcome.kind, SummaryKind::Reduced);
        assert_eq!(result.outcome.summary, "Every section reported steady growth.");
        assert_eq!(result.outcome.stats.chunk_count, 3);
        assert_eq!(model.call_count(), 4);

        let prompts = model.prompts();
        let reduction = prompts.last().expect("reduction prompt");
        let alpha = reduction.find("section alpha").expect("alpha");
        let beta = reduction.find("section beta").expect("beta");
        let gamma = reduction.find("section gamma").expect("gamma");
        assert!(alpha < beta && beta < gamma);
        assert_eq!(api.metrics_snapshot().documents_summarized, 1);
    }

    #[test]
    fn configured_chunk_size_applies_unless_overridden() {
        let settings = SummarizerSettings::default().with_chunk_size(Some(1200));
        let service = SummaryService::with_model(settings, ScriptedModel::replying("unused"));

        assert_eq!(service.model_label(), "scripted");
        assert_eq!(service.resolve_chunk_size(None).expect("size"), 1200);
        assert_eq!(service.resolve_chunk_size(Some(300)).expect("size"), 300);
    }
}
