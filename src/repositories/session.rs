use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::PersistenceError;
use crate::analysis::{Dimension, DimensionOutcome};
use crate::entities::{
    AnalysisRow, Session, SessionId, SessionRow, SessionStatus, StoredResult,
};
use crate::scoring::ReadabilityMetrics;

const SESSION_COLUMNS: &str = "id, url, title, status, readability, created_at, completed_at";

/// Relational store for sessions and their per-dimension results.
#[async_trait]
pub trait SessionRepositoryTrait: Send + Sync {
    async fn create_session(
        &self,
        url: &str,
        title: Option<&str>,
        readability: &ReadabilityMetrics,
    ) -> Result<Session, PersistenceError>;

    /// Inserts or replaces the row for `(session_id, dimension)`.
    async fn store_analysis(
        &self,
        session_id: SessionId,
        dimension: Dimension,
        outcome: &DimensionOutcome,
    ) -> Result<(), PersistenceError>;

    async fn set_status(
        &self,
        session_id: SessionId,
        status: SessionStatus,
    ) -> Result<(), PersistenceError>;

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, PersistenceError>;

    /// Stored rows ordered by dimension name.
    async fn get_results(&self, session_id: SessionId)
    -> Result<Vec<StoredResult>, PersistenceError>;

    /// Most recently created first.
    async fn list_sessions(&self, limit: u32) -> Result<Vec<Session>, PersistenceError>;

    async fn find_latest_completed(&self, url: &str) -> Result<Option<Session>, PersistenceError>;

    async fn count_sessions(&self) -> Result<u64, PersistenceError>;
}

#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepositoryTrait for SqliteSessionRepository {
    async fn create_session(
        &self,
        url: &str,
        title: Option<&str>,
        readability: &ReadabilityMetrics,
    ) -> Result<Session, PersistenceError> {
        let session = Session {
            id: SessionId::new(),
            url: url.to_string(),
            title: title.map(str::to_string),
            status: SessionStatus::Pending,
            readability: Some(readability.clone()),
            created_at: Utc::now(),
            completed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, url, title, status, readability, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.url)
        .bind(&session.title)
        .bind(session.status)
        .bind(serde_json::to_string(readability)?)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    async fn store_analysis(
        &self,
        session_id: SessionId,
        dimension: Dimension,
        outcome: &DimensionOutcome,
    ) -> Result<(), PersistenceError> {
        let (kind, score, verdict, recommendations, details, raw, failure_kind, failure_message) =
            match outcome {
                DimensionOutcome::Completed(result) => (
                    "completed",
                    result.score,
                    Some(result.verdict.as_str()),
                    serde_json::to_string(&result.recommendations)?,
                    serde_json::to_string(&result.details)?,
                    Some(result.raw_response.as_str()),
                    None,
                    None,
                ),
                DimensionOutcome::Unavailable(failure) => (
                    "unavailable",
                    None,
                    None,
                    "[]".to_string(),
                    "[]".to_string(),
                    None,
                    Some(failure.kind.as_str()),
                    Some(failure.message.as_str()),
                ),
            };

        sqlx::query(
            r#"
            INSERT INTO analysis_results
                  (session_id, dimension, outcome, score, verdict, recommendations,
                   details, raw_response, failure_kind, failure_message, stored_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (session_id, dimension) DO UPDATE
              SET outcome         = excluded.outcome,
                  score           = excluded.score,
                  verdict         = excluded.verdict,
                  recommendations = excluded.recommendations,
                  details         = excluded.details,
                  raw_response    = excluded.raw_response,
                  failure_kind    = excluded.failure_kind,
                  failure_message = excluded.failure_message,
                  stored_at       = excluded.stored_at
            "#,
        )
        .bind(session_id.to_string())
        .bind(dimension.as_str())
        .bind(kind)
        .bind(score)
        .bind(verdict)
        .bind(recommendations)
        .bind(details)
        .bind(raw)
        .bind(failure_kind)
        .bind(failure_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_status(
        &self,
        session_id: SessionId,
        status: SessionStatus,
    ) -> Result<(), PersistenceError> {
        let completed_at = status.is_terminal().then(Utc::now);
        let result = sqlx::query("UPDATE sessions SET status = ?, completed_at = ? WHERE id = ?")
            .bind(status)
            .bind(completed_at)
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::SessionNotFound(session_id));
        }
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, PersistenceError> {
        let row: Option<SessionRow> =
            sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"))
                .bind(session_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Session::try_from).transpose()
    }

    async fn get_results(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<StoredResult>, PersistenceError> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT dimension, outcome, score, verdict, recommendations, details,
                   raw_response, failure_kind, failure_message, stored_at
            FROM analysis_results
            WHERE session_id = ?
            ORDER BY dimension ASC
            "#,
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredResult::try_from).collect()
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<Session>, PersistenceError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY seq DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Session::try_from).collect()
    }

    async fn find_latest_completed(&self, url: &str) -> Result<Option<Session>, PersistenceError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE url = ? AND status = 'completed'
             ORDER BY seq DESC LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    async fn count_sessions(&self) -> Result<u64, PersistenceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
