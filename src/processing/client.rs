//! Single-call summarization client.

use crate::summarization::{LanguageModel, RemoteModelError};
use std::sync::Arc;
use std::time::Duration;

use super::types::SummaryResult;

/// Wraps one call to the language model and converts every failure into a [`SummaryResult`].
///
/// Each [`Summarizer::summarize`] issues at most one request and never retries; retry policy,
/// if any, belongs to the caller or the transport.
#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    min_chars: usize,
    timeout: Option<Duration>,
}

impl Summarizer {
    /// Create a client with the default 50-character minimum and no timeout.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            min_chars: crate::config::DEFAULT_MIN_CHUNK_CHARS,
            timeout: None,
        }
    }

    /// Inputs whose trimmed length is below `min_chars` return [`SummaryResult::TooShort`].
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Bound each model call; an elapsed timeout is reported as a failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Identifier of the wrapped model.
    pub fn describe(&self) -> String {
        self.model.describe()
    }

    /// Summarize `text`.
    pub async fn summarize(&self, text: &str) -> SummaryResult {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_chars {
            return SummaryResult::TooShort;
        }

        let prompt = build_summary_prompt(trimmed);
        let call = self.model.complete(&prompt);
        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(RemoteModelError::Timeout(format!(
                    "no response within {} ms",
                    limit.as_millis()
                ))),
            },
            None => call.await,
        };

        match response {
            Ok(summary) if summary.trim().is_empty() => {
                SummaryResult::Failed("model returned an empty summary".into())
            }
            Ok(summary) => SummaryResult::Summarized(summary.trim().to_string()),
            Err(error) => {
                tracing::warn!(
                    kind = error.kind(),
                    error = %error,
                    model = %self.model.describe(),
                    "Summarization call failed"
                );
                SummaryResult::Failed(error.to_string())
            }
        }
    }
}

/// Build the summarization prompt around `text`.
pub(crate) fn build_summary_prompt(text: &str) -> String {
    format!(
        "Write a concise summary of the following text. Highlight the main points and key information:\n\nTEXT: {text}\n\nSUMMARY:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_support::ScriptedModel;
    use async_trait::async_trait;

    #[tokio::test]
    async fn short_input_is_rejected_without_a_call() {
        let model = ScriptedModel::replying("unused");
        let summarizer = Summarizer::new(model.clone());

        let result = summarizer.summarize("   too short   ").await;

        assert_eq!(result, SummaryResult::TooShort);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_call_returns_trimmed_summary() {
        let model = ScriptedModel::replying("  The gist.  ");
        let summarizer = Summarizer::new(model.clone()).with_min_chars(5);

        let result = summarizer.summarize("A long enough passage of text.").await;

        assert_eq!(result, SummaryResult::Summarized("The gist.".into()));
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("TEXT: A long enough passage of text."));
        assert!(prompts[0].ends_with("SUMMARY:"));
    }

    #[tokio::test]
    async fn remote_errors_become_failed_results() {
        let model = ScriptedModel::new(|_| Err(RemoteModelError::Quota("slow down".into())));
        let summarizer = Summarizer::new(model.clone()).with_min_chars(1);

        let result = summarizer.summarize("Some text").await;

        assert!(matches!(&result, SummaryResult::Failed(reason) if reason.contains("quota")));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_model_output_is_a_failure() {
        let model = ScriptedModel::replying("   ");
        let summarizer = Summarizer::new(model).with_min_chars(1);

        assert!(matches!(
            summarizer.summarize("Some text").await,
            SummaryResult::Failed(_)
        ));
    }

    struct StalledModel;

    #[async_trait]
    impl LanguageModel for StalledModel {
        async fn complete(&self, _prompt: &str) -> Result<String, RemoteModelError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".into())
        }

        fn describe(&self) -> String {
            "stalled".into()
        }
    }

    #[tokio::test]
    async fn timeout_is_reported_as_failure() {
        let summarizer = Summarizer::new(Arc::new(StalledModel))
            .with_min_chars(1)
            .with_timeout(Some(Duration::from_millis(20)));

        let result = summarizer.summarize("Some text").await;

        assert!(matches!(&result, SummaryResult::Failed(reason) if reason.contains("timed out")));
    }
}
