//! One analysis request, end to end: extract, score, persist, analyze.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use url::Url;
use utoipa::ToSchema;

use crate::analysis::{AnalysisError, Analyzer, Dimension};
use crate::directory::{SessionDetail, SessionDirectory};
use crate::embedding::Embedder;
use crate::entities::{NewDocument, SessionId, SessionStatus};
use crate::extractor::{ExtractionError, ExtractionHints, PageSource};
use crate::repositories::{Persistence, PersistenceError};
use crate::scoring::{self, ScoringError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    InsufficientText(#[from] ScoringError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session {0} has no stored document")]
    DocumentMissing(SessionId),
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AnalyzeOptions {
    /// Re-run even when a completed session exists for the URL.
    #[serde(default)]
    pub force: bool,
    /// Selectors that steer extraction for this page.
    #[serde(default)]
    pub hints: ExtractionHints,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub detail: SessionDetail,
    /// True when an earlier completed session was returned as is.
    pub reused: bool,
}

#[derive(Clone)]
pub struct AnalysisService {
    source: Arc<dyn PageSource>,
    analyzer: Analyzer,
    embedder: Arc<dyn Embedder>,
    persistence: Persistence,
    directory: SessionDirectory,
}

impl AnalysisService {
    pub fn new(
        source: Arc<dyn PageSource>,
        analyzer: Analyzer,
        embedder: Arc<dyn Embedder>,
        persistence: Persistence,
    ) -> Self {
        Self {
            source,
            analyzer,
            embedder,
            directory: SessionDirectory::new(persistence.clone()),
            persistence,
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Runs the full pipeline for `url`. Extraction and scoring failures
    /// leave no trace in storage; once a session exists it always ends in a
    /// terminal status. A completed session is reused by URL alone, so new
    /// hints only take effect with `force`.
    #[instrument(skip(self, cancel), fields(force = options.force))]
    pub async fn analyze(
        &self,
        url: &str,
        options: AnalyzeOptions,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, PipelineError> {
        if !options.force
            && let Some(existing) = self
                .persistence
                .sessions()
                .find_latest_completed(&canonical_url(url))
                .await?
            && let Some(detail) = self.directory.get_session(existing.id).await?
        {
            info!(session_id = %existing.id, "reusing completed session");
            return Ok(AnalysisOutcome {
                detail,
                reused: true,
            });
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            page = self.source.extract(url, &options.hints) => page?,
        };
        let metrics = scoring::score(&page.text)?;

        let embedding = match self.embedder.embed(&page.text).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(url = %page.url, error = %err, "storing document without embedding");
                None
            }
        };

        let title = Some(page.title.as_str()).filter(|t| !t.trim().is_empty());
        let session = self
            .persistence
            .create_session(page.url.as_str(), title, &metrics)
            .await?;

        let document = NewDocument {
            url: page.url.to_string(),
            title: title.map(str::to_string),
            language: page.language.clone(),
            content: page.text.clone(),
            embedding,
        };
        if let Err(err) = self.persistence.put_document(session.id, &document).await {
            warn!(session_id = %session.id, error = %err, "document write failed");
            if let Err(status_err) = self
                .persistence
                .set_status(session.id, SessionStatus::Failed)
                .await
            {
                warn!(session_id = %session.id, error = %status_err, "could not mark session failed");
            }
            return Err(err.into());
        }

        let report = match self.analyzer.analyze(&page.text, &metrics, cancel).await {
            Ok(report) => report,
            Err(AnalysisError::Cancelled) => {
                self.persistence
                    .set_status(session.id, SessionStatus::Cancelled)
                    .await?;
                return Err(PipelineError::Cancelled);
            }
        };

        let status = self
            .persistence
            .store_report(session.id, &report.outcomes)
            .await?;
        info!(
            session_id = %session.id,
            ?status,
            ease = metrics.flesch_reading_ease,
            "analysis stored"
        );

        let detail = self
            .directory
            .get_session(session.id)
            .await?
            .ok_or(PipelineError::SessionNotFound(session.id))?;
        Ok(AnalysisOutcome {
            detail,
            reused: false,
        })
    }

    /// Re-runs one dimension against the stored text and overwrites its row.
    #[instrument(skip(self, cancel))]
    pub async fn rerun_dimension(
        &self,
        session_id: SessionId,
        dimension: Dimension,
        cancel: &CancellationToken,
    ) -> Result<SessionDetail, PipelineError> {
        let session = self
            .persistence
            .get_session(session_id)
            .await?
            .ok_or(PipelineError::SessionNotFound(session_id))?;
        let document = self
            .persistence
            .documents()
            .get_document(session_id)
            .await?
            .ok_or(PipelineError::DocumentMissing(session_id))?;

        let metrics = match session.readability {
            Some(metrics) => metrics,
            None => scoring::score(&document.content)?,
        };

        let outcome = self
            .analyzer
            .analyze_dimension(dimension, &document.content, &metrics, cancel)
            .await
            .map_err(|AnalysisError::Cancelled| PipelineError::Cancelled)?;

        let status = self
            .persistence
            .replace_dimension(session_id, dimension, &outcome)
            .await?;
        info!(%session_id, %dimension, ?status, "dimension re-run stored");

        self.directory
            .get_session(session_id)
            .await?
            .ok_or(PipelineError::SessionNotFound(session_id))
    }
}

/// The form a URL is stored in, so lookups match what extraction recorded.
pub fn canonical_url(url: &str) -> String {
    Url::parse(url.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.trim().to_string())
}
