//! HTTP surface for Rusty Summary.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Summarize raw text. Accepts `{ "text": ..., "chunk_size": n? }` and
//!   returns the final summary, how it was produced (`kind`), the effective chunk size, and
//!   chunk counters.
//! - `POST /summarize/pdf` – Summarize a PDF sent as the raw request body (`?chunk_size=&name=`).
//!   The response additionally carries the extracted text.
//! - `POST /summarize/stream` – Same input as `/summarize`, answered as Server-Sent Events:
//!   `progress` events while the pipeline runs, then one `summary` (or `error`) event.
//! - `GET /metrics` – Observe summarization counters and the last chunk size used.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::extraction::ExtractionError;
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    ChannelProgress, DocumentSummary, ProcessingError, ProgressUpdate, SummaryApi, SummaryKind,
    SummaryStats, TracingProgress,
};
use async_stream::stream;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

/// Largest PDF upload accepted by `POST /summarize/pdf`.
pub const MAX_PDF_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_text::<S>))
        .route(
            "/summarize/pdf",
            post(summarize_pdf::<S>).layer(DefaultBodyLimit::max(MAX_PDF_BYTES)),
        )
        .route("/summarize/stream", post(summarize_stream::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for `POST /summarize` and `POST /summarize/stream`.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Raw text to summarize.
    text: String,
    /// Optional chunk size override (defaults to `TEXT_SPLITTER_CHUNK_SIZE` or the unit default).
    #[serde(default)]
    chunk_size: Option<usize>,
}

/// Query parameters for `POST /summarize/pdf`.
#[derive(Deserialize)]
struct PdfQuery {
    #[serde(default)]
    chunk_size: Option<usize>,
    /// Label used in logs and error messages.
    #[serde(default)]
    name: Option<String>,
}

/// Success response for the summarize endpoints.
#[derive(Serialize)]
struct SummaryResponse {
    request_id: String,
    summary: String,
    kind: SummaryKind,
    sentinel: bool,
    chunk_size: usize,
    stats: SummaryStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted_text: Option<String>,
}

impl SummaryResponse {
    fn new(request_id: Uuid, document: DocumentSummary, include_text: bool) -> Self {
        let DocumentSummary {
            text,
            chunk_size,
            outcome,
        } = document;
        Self {
            request_id: request_id.to_string(),
            summary: outcome.summary,
            kind: outcome.kind,
            sentinel: outcome.kind.is_sentinel(),
            chunk_size,
            stats: outcome.stats,
            extracted_text: include_text.then_some(text),
        }
    }
}

/// Summarize raw text.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, bytes = request.text.len(), "Summarize request received");
    let document = service
        .summarize_text(request.text, request.chunk_size, &TracingProgress)
        .await?;
    tracing::info!(
        %request_id,
        kind = ?document.outcome.kind,
        chunk_size = document.chunk_size,
        "Summarize request completed"
    );
    Ok(Json(SummaryResponse::new(request_id, document, false)))
}

/// Summarize a PDF uploaded as the raw request body.
async fn summarize_pdf<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<PdfQuery>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let request_id = Uuid::new_v4();
    let source_name = query.name.unwrap_or_else(|| format!("upload-{request_id}.pdf"));
    tracing::info!(%request_id, source = %source_name, bytes = body.len(), "PDF summarize request received");
    let document = service
        .summarize_pdf_bytes(source_name, body.to_vec(), query.chunk_size, &TracingProgress)
        .await?;
    tracing::info!(
        %request_id,
        kind = ?document.outcome.kind,
        chunk_size = document.chunk_size,
        "PDF summarize request completed"
    );
    Ok(Json(SummaryResponse::new(request_id, document, true)))
}

/// Stream progress updates, then the final summary, as Server-Sent Events.
async fn summarize_stream<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: SummaryApi + 'static,
{
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        bytes = request.text.len(),
        "Streaming summarize request received"
    );
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel::<ProgressUpdate>();
    let task = tokio::spawn(async move {
        let progress = ChannelProgress::new(sender);
        service
            .summarize_text(request.text, request.chunk_size, &progress)
            .await
    });

    let events = stream! {
        while let Some(update) = receiver.recv().await {
            yield Ok(json_event("progress", &update));
        }
        let last = match task.await {
            Ok(Ok(document)) => {
                json_event("summary", &SummaryResponse::new(request_id, document, false))
            }
            Ok(Err(error)) => {
                tracing::warn!(%request_id, error = %error, "Streaming summarize request failed");
                Event::default().event("error").data(error.to_string())
            }
            Err(error) => {
                tracing::error!(%request_id, error = %error, "Summarize task aborted");
                Event::default().event("error").data("summarization task aborted")
            }
        };
        yield Ok(last);
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    let event = Event::default().event(name);
    match serde_json::to_string(payload) {
        Ok(data) => event.data(data),
        Err(error) => event.data(json!({ "error": error.to_string() }).to_string()),
    }
}

/// Return the summarization counters and the last chunk size.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Chunk raw text, summarize each chunk, and reduce the chunk summaries into one. Response returns { \"summary\": string, \"kind\": string, \"sentinel\": bool, \"chunk_size\": number }.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "chunk_size": 4000
                })),
            },
            CommandDescriptor {
                name: "summarize_pdf",
                method: "POST",
                path: "/summarize/pdf",
                description: "Send a PDF as the raw request body; extracts its text and summarizes it. Optional query parameters: chunk_size, name.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize_stream",
                method: "POST",
                path: "/summarize/stream",
                description: "Like /summarize but answers with Server-Sent Events: progress events, then a summary event.",
                request_example: Some(json!({
                    "text": "Document contents"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(ProcessingError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ProcessingError::Extraction(ExtractionError::NotFound(_)) => StatusCode::NOT_FOUND,
            ProcessingError::Extraction(ExtractionError::Malformed { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ProcessingError::Chunking(_) => StatusCode::BAD_REQUEST,
            ProcessingError::Extraction(ExtractionError::Read { .. })
            | ProcessingError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self(inner)
    }
}
