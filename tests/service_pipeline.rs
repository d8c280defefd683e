use std::sync::Mutex;

use httpmock::{Method::POST, MockServer};
use rustysummary::{
    config::{SummarizationProvider, SummarizerSettings},
    extraction::ExtractionError,
    processing::{
        ProcessingError, SummaryKind, SummaryService, progress::TERMINAL_PROGRESS,
        reducer::ALL_CHUNKS_FAILED_MESSAGE,
    },
};
use serde_json::json;

fn paragraph(name: &str) -> String {
    format!("Section {name} describes the quarterly results in detail and lists the main findings.")
}

fn document() -> String {
    ["alpha", "beta", "gamma"]
        .iter()
        .map(|name| paragraph(name))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn ollama_settings(server: &MockServer) -> SummarizerSettings {
    SummarizerSettings {
        provider: SummarizationProvider::Ollama,
        model: "llama3.1".into(),
        base_url: Some(server.base_url()),
        chunk_size: Some(100),
        chunk_overlap: 0,
        ..SummarizerSettings::default()
    }
}

fn generate_reply(text: &str) -> serde_json::Value {
    json!({ "model": "llama3.1", "response": text, "done": true })
}

#[tokio::test]
async fn ollama_pipeline_survives_one_failed_chunk() {
    let server = MockServer::start_async().await;
    let reduction = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Summary of section");
            then.status(200)
                .json_body(generate_reply("Quarterly results were strong across sections."));
        })
        .await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Section beta ");
            then.status(500).body("model crashed");
        })
        .await;
    let mut chunk_mocks = Vec::new();
    for name in ["alpha", "gamma"] {
        let marker = format!("Section {name} ");
        let reply = format!("Summary of section {name}: results were reviewed in detail.");
        chunk_mocks.push(
            server
                .mock_async(|when, then| {
                    when.method(POST).path("/api/generate").body_contains(&marker);
                    then.status(200).json_body(generate_reply(&reply));
                })
                .await,
        );
    }

    let service = SummaryService::new(ollama_settings(&server)).expect("service");
    let fractions = Mutex::new(Vec::new());
    let progress = |fraction: f32, _description: &str| {
        fractions.lock().expect("lock").push(fraction);
    };

    let result = service
        .summarize_text(document(), None, &progress)
        .await
        .expect("summary");

    assert_eq!(result.outcome.kind, SummaryKind::Reduced);
    assert_eq!(
        result.outcome.summary,
        "Quarterly results were strong across sections."
    );
    assert_eq!(result.outcome.stats.chunk_count, 3);
    assert_eq!(result.outcome.stats.failed, 1);
    reduction.assert_hits_async(1).await;
    failing.assert_hits_async(1).await;
    for mock in &chunk_mocks {
        mock.assert_hits_async(1).await;
    }

    let fractions = fractions.into_inner().expect("lock");
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last().copied(), Some(TERMINAL_PROGRESS));

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.documents_summarized, 1);
    assert_eq!(metrics.chunk_failures, 1);
    assert_eq!(metrics.last_chunk_size, Some(100));
}

#[tokio::test]
async fn unreachable_backend_yields_all_chunks_failed_sentinel() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(503).body("loading model");
        })
        .await;

    let service = SummaryService::new(ollama_settings(&server)).expect("service");
    let result = service
        .summarize_text(document(), None, &|_: f32, _: &str| {})
        .await
        .expect("summary");

    assert_eq!(result.outcome.kind, SummaryKind::AllChunksFailed);
    assert_eq!(result.outcome.summary, ALL_CHUNKS_FAILED_MESSAGE);
}

#[tokio::test]
async fn missing_pdf_is_not_found() {
    let server = MockServer::start_async().await;
    let service = SummaryService::new(ollama_settings(&server)).expect("service");

    let error = service
        .process_pdf("no/such/file.pdf", &|_: f32, _: &str| {})
        .await
        .expect_err("missing file");

    assert!(matches!(
        error,
        ProcessingError::Extraction(ExtractionError::NotFound(_))
    ));
}

#[test]
fn openai_without_key_is_rejected() {
    let result = SummaryService::new(SummarizerSettings::default());
    assert!(result.is_err());
}
