use tokio::time::Instant;

use crate::config::completion::{get_completion_config, CompletionConfig};
use crate::error::ReplyError;
use crate::metrics::Metrics;
use crate::pipelines::deepseek;
use crate::pipelines::normalizer::{self, FALLBACK_MESSAGE};

/// DeepSeek chat model: fetches completions and normalizes them for display
#[derive(Clone, Debug)]
pub struct DeepSeekModel {
    config: CompletionConfig,
    metrics: Metrics,
}

impl DeepSeekModel {
    pub fn new(config: CompletionConfig) -> Self {
        DeepSeekModel {
            config,
            metrics: Metrics::new(),
        }
    }

    /// Model built from the process-wide config
    pub fn from_default_config() -> Self {
        Self::new(get_completion_config().clone())
    }

    pub fn name(&self) -> &str {
        &self.config.model
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Raw first-choice text, before normalization
    pub async fn call_text(&self, prompt: &str) -> Result<String, ReplyError> {
        let start = Instant::now();
        match deepseek::fetch_completion(&self.config, prompt).await {
            Ok(raw) => {
                self.metrics.record_completion(start.elapsed().as_millis() as u64);
                Ok(raw)
            }
            Err(e) => {
                self.metrics.record_fetch_error();
                Err(e)
            }
        }
    }

    /// Fetch a completion and normalize it. Fetch errors skip normalization.
    pub async fn ask(&self, prompt: &str) -> Result<String, ReplyError> {
        let raw = self.call_text(prompt).await?;

        tracing::debug!(
            model = %self.config.model,
            raw_response_preview = %raw.chars().take(500).collect::<String>(),
            "DeepSeek raw response"
        );

        let answer = normalizer::normalize(&raw);
        if answer == FALLBACK_MESSAGE {
            self.metrics.record_fallback();
            tracing::warn!(model = %self.config.model, "No usable answer in completion");
        }
        Ok(answer)
    }
}
