#![deny(missing_docs)]

//! Core library for Rusty Summary: PDF text extraction and hierarchical LLM summarization.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Chunking, summarization, and reduction pipeline.
pub mod processing;
/// Language model capability and provider adapters.
pub mod summarization;
