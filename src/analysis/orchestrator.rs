use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::backoff::retry_delay;
use super::parser::parse_response;
use super::prompts::build_prompt;
use super::{
    AnalysisError, AnalysisFailure, AnalysisReport, Dimension, DimensionOutcome, FailureKind,
};
use crate::config::LlmSettings;
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::scoring::ReadabilityMetrics;

/// Transient failures get this many extra attempts.
const MAX_RETRIES: u32 = 1;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Upper bound on a single model call, retries excluded.
    pub call_timeout: Duration,
    pub retry_base_delay: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            retry_base_delay: Duration::from_millis(750),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl From<&LlmSettings> for AnalyzerConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            call_timeout: settings.timeout,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            ..Self::default()
        }
    }
}

/// Runs the four dimension analyses against a [`LanguageModel`].
#[derive(Clone)]
pub struct Analyzer {
    model: Arc<dyn LanguageModel>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(model: Arc<dyn LanguageModel>, config: AnalyzerConfig) -> Self {
        Self { model, config }
    }

    /// Analyzes every dimension concurrently. Each dimension settles on its
    /// own; cancellation aborts whatever is still in flight.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub async fn analyze(
        &self,
        text: &str,
        metrics: &ReadabilityMetrics,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut tasks = JoinSet::new();
        for dimension in Dimension::ALL {
            let prompt = build_prompt(dimension, text, metrics);
            let model = Arc::clone(&self.model);
            let config = self.config.clone();
            let ease = metrics.flesch_reading_ease;
            tasks.spawn(async move {
                let outcome = run_dimension(model.as_ref(), &config, dimension, prompt, ease).await;
                (dimension, outcome)
            });
        }

        let mut report = AnalysisReport::default();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    warn!("analysis cancelled; outstanding model calls aborted");
                    return Err(AnalysisError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((dimension, outcome))) => {
                        report.outcomes.insert(dimension, outcome);
                    }
                    Some(Err(err)) => warn!(error = %err, "dimension task failed"),
                    None => break,
                },
            }
        }

        // A task that panicked never reported back
        for dimension in Dimension::ALL {
            report.outcomes.entry(dimension).or_insert_with(|| {
                DimensionOutcome::Unavailable(AnalysisFailure::new(
                    FailureKind::Internal,
                    "analysis task terminated unexpectedly",
                ))
            });
        }

        info!(
            completed = report.completed(),
            unavailable = report.outcomes.len() - report.completed(),
            "analysis finished"
        );
        Ok(report)
    }

    /// Analyzes a single dimension.
    #[instrument(skip(self, text, metrics, cancel))]
    pub async fn analyze_dimension(
        &self,
        dimension: Dimension,
        text: &str,
        metrics: &ReadabilityMetrics,
        cancel: &CancellationToken,
    ) -> Result<DimensionOutcome, AnalysisError> {
        let prompt = build_prompt(dimension, text, metrics);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            outcome = run_dimension(
                self.model.as_ref(),
                &self.config,
                dimension,
                prompt,
                metrics.flesch_reading_ease,
            ) => Ok(outcome),
        }
    }
}

async fn run_dimension(
    model: &dyn LanguageModel,
    config: &AnalyzerConfig,
    dimension: Dimension,
    prompt: String,
    readability_ease: f64,
) -> DimensionOutcome {
    let request = CompletionRequest {
        prompt,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    let mut attempt = 0;
    let raw = loop {
        let result = tokio::time::timeout(config.call_timeout, model.complete(request.clone()))
            .await
            .unwrap_or(Err(LlmError::Timeout));

        match result {
            Ok(raw) => break raw,
            Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                let retry_after = match &err {
                    LlmError::RateLimited { retry_after_secs } => *retry_after_secs,
                    _ => None,
                };
                let delay = retry_delay(attempt, config.retry_base_delay, retry_after);
                warn!(%dimension, error = %err, ?delay, "transient model failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(%dimension, error = %err, "dimension unavailable");
                return DimensionOutcome::Unavailable(err.into());
            }
        }
    };

    match parse_response(dimension, &raw, readability_ease) {
        Ok(result) => DimensionOutcome::Completed(result),
        Err(failure) => {
            warn!(%dimension, "model response could not be parsed");
            DimensionOutcome::Unavailable(failure)
        }
    }
}
