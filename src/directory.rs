//! Read-only view over stored sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::analysis::{Dimension, DimensionOutcome};
use crate::entities::{Session, SessionId, SessionStatus, StoredDocument};
use crate::extractor::preview;
use crate::repositories::{Persistence, PersistenceError};

pub const PREVIEW_CHARS: usize = 200;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub id: SessionId,
    pub url: String,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub flesch_reading_ease: Option<f64>,
    pub preview: Option<String>,
    pub completed_dimensions: Vec<Dimension>,
}

/// Stored document without its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentView {
    pub url_digest: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub word_count: usize,
    pub embedding_dimensions: Option<usize>,
    pub content: String,
}

impl From<StoredDocument> for DocumentView {
    fn from(doc: StoredDocument) -> Self {
        Self {
            url_digest: doc.url_digest,
            title: doc.title,
            language: doc.language,
            word_count: doc.content.split_whitespace().count(),
            embedding_dimensions: doc.embedding.as_ref().map(Vec::len),
            content: doc.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DimensionEntry {
    pub dimension: Dimension,
    pub outcome: DimensionOutcome,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionDetail {
    pub session: Session,
    pub document: Option<DocumentView>,
    /// Ordered by dimension name.
    pub results: Vec<DimensionEntry>,
    /// Dimensions with an unavailable marker or no row at all.
    pub unavailable: Vec<Dimension>,
}

impl SessionDetail {
    pub fn outcome(&self, dimension: Dimension) -> Option<&DimensionOutcome> {
        self.results
            .iter()
            .find(|e| e.dimension == dimension)
            .map(|e| &e.outcome)
    }
}

#[derive(Clone)]
pub struct SessionDirectory {
    persistence: Persistence,
}

impl SessionDirectory {
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    /// Most recent first; `limit` is capped at [`MAX_LIST_LIMIT`].
    #[instrument(skip(self))]
    pub async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionSummary>, PersistenceError> {
        let sessions = self
            .persistence
            .sessions()
            .list_sessions(limit.clamp(1, MAX_LIST_LIMIT))
            .await?;

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let document = self.persistence.documents().get_document(session.id).await?;
            let results = self.persistence.get_results(session.id).await?;
            summaries.push(SessionSummary {
                id: session.id,
                flesch_reading_ease: session.readability.as_ref().map(|r| r.flesch_reading_ease),
                preview: document.map(|d| preview(&d.content, PREVIEW_CHARS)),
                completed_dimensions: results
                    .iter()
                    .filter(|r| r.outcome.is_completed())
                    .map(|r| r.dimension)
                    .collect(),
                url: session.url,
                title: session.title,
                status: session.status,
                created_at: session.created_at,
            });
        }
        Ok(summaries)
    }

    #[instrument(skip(self))]
    pub async fn get_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionDetail>, PersistenceError> {
        let Some(session) = self.persistence.get_session(session_id).await? else {
            return Ok(None);
        };
        let document = self.persistence.documents().get_document(session_id).await?;
        let stored = self.persistence.get_results(session_id).await?;

        let results: Vec<DimensionEntry> = stored
            .into_iter()
            .map(|r| DimensionEntry {
                dimension: r.dimension,
                outcome: r.outcome,
                stored_at: r.stored_at,
            })
            .collect();

        let mut unavailable: Vec<Dimension> = Dimension::ALL
            .into_iter()
            .filter(|d| {
                !results
                    .iter()
                    .any(|e| e.dimension == *d && e.outcome.is_completed())
            })
            .collect();
        unavailable.sort();

        Ok(Some(SessionDetail {
            session,
            document: document.map(DocumentView::from),
            results,
            unavailable,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisFailure, AnalysisResult, FailureKind};
    use crate::entities::NewDocument;
    use crate::repositories::test_pool;
    use crate::scoring::score;
    use std::collections::BTreeMap;

    async fn seeded() -> (SessionDirectory, SessionId) {
        let persistence = Persistence::sqlite(test_pool().await);
        let metrics = score("The cat sat on the mat. The dog ran to the park. We had fun.").unwrap();
        let session = persistence
            .create_session("https://example.com/doc", Some("Doc"), &metrics)
            .await
            .unwrap();
        persistence
            .put_document(
                session.id,
                &NewDocument {
                    url: "https://example.com/doc".to_string(),
                    title: Some("Doc".to_string()),
                    language: Some("en".to_string()),
                    content: "word ".repeat(300),
                    embedding: None,
                },
            )
            .await
            .unwrap();

        let mut outcomes = BTreeMap::new();
        for dimension in [Dimension::Readability, Dimension::Structure, Dimension::Completeness] {
            outcomes.insert(
                dimension,
                DimensionOutcome::Completed(AnalysisResult {
                    score: Some(5.0),
                    verdict: "Fine.".to_string(),
                    recommendations: vec![],
                    details: vec![],
                    raw_response: String::new(),
                }),
            );
        }
        outcomes.insert(
            Dimension::Style,
            DimensionOutcome::Unavailable(AnalysisFailure::new(
                FailureKind::UnparseableResponse,
                "no assessment",
            )),
        );
        persistence.store_report(session.id, &outcomes).await.unwrap();

        (SessionDirectory::new(persistence), session.id)
    }

    #[tokio::test]
    async fn test_get_session_detail() {
        let (directory, id) = seeded().await;
        let detail = directory.get_session(id).await.unwrap().unwrap();

        assert_eq!(detail.session.status, SessionStatus::Partial);
        let dims: Vec<_> = detail.results.iter().map(|e| e.dimension).collect();
        assert_eq!(
            dims,
            vec![
                Dimension::Completeness,
                Dimension::Readability,
                Dimension::Structure,
                Dimension::Style
            ]
        );
        assert_eq!(detail.unavailable, vec![Dimension::Style]);
        assert_eq!(detail.document.unwrap().word_count, 300);
    }

    #[tokio::test]
    async fn test_list_sessions_summaries() {
        let (directory, id) = seeded().await;
        let summaries = directory.list_sessions(10).await.unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, id);
        assert_eq!(summaries[0].completed_dimensions.len(), 3);
        let preview = summaries[0].preview.as_deref().unwrap();
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let (directory, _) = seeded().await;
        assert!(directory.get_session(SessionId::new()).await.unwrap().is_none());
    }
}
