use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analysis::{AnalysisFailure, AnalysisResult, Dimension, DimensionOutcome, FailureKind};
use crate::repositories::PersistenceError;
use crate::scoring::ReadabilityMetrics;

/// --- Identifiers ---

/// Stable identifier of an analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// --- Enums ---

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Analysis in progress, no results stored yet.
    Pending,
    Completed,
    /// At least one dimension unavailable, at least one completed.
    Partial,
    /// Every dimension unavailable.
    Failed,
    /// Aborted before any result was stored.
    Cancelled,
}

impl SessionStatus {
    /// Status implied by `completed` successful dimensions out of `total`.
    pub fn from_counts(completed: usize, total: usize) -> Self {
        match completed {
            0 => Self::Failed,
            n if n >= total => Self::Completed,
            _ => Self::Partial,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// --- Domain records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub id: SessionId,
    pub url: String,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub readability: Option<ReadabilityMetrics>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One stored dimension row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub dimension: Dimension,
    pub outcome: DimensionOutcome,
    pub stored_at: DateTime<Utc>,
}

/// Input to the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub url: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub session_id: SessionId,
    pub url_digest: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub stored_at: DateTime<Utc>,
}

/// --- Tables ---

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub readability: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for Session {
    type Error = PersistenceError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse()
            .map_err(|e| PersistenceError::Corrupt(format!("session id '{}': {e}", row.id)))?;
        let readability = row
            .readability
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| PersistenceError::Corrupt(format!("readability of {id}: {e}")))?;

        Ok(Self {
            id,
            url: row.url,
            title: row.title,
            status: row.status,
            readability,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub dimension: String,
    pub outcome: String,
    pub score: Option<f64>,
    pub verdict: Option<String>,
    pub recommendations: String,
    pub details: String,
    pub raw_response: Option<String>,
    pub failure_kind: Option<String>,
    pub failure_message: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for StoredResult {
    type Error = PersistenceError;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        let dimension: Dimension = row
            .dimension
            .parse()
            .map_err(|e| PersistenceError::Corrupt(format!("{e}")))?;

        let outcome = match row.outcome.as_str() {
            "completed" => DimensionOutcome::Completed(AnalysisResult {
                score: row.score,
                verdict: row.verdict.unwrap_or_default(),
                recommendations: serde_json::from_str(&row.recommendations).map_err(|e| {
                    PersistenceError::Corrupt(format!("{dimension} recommendations: {e}"))
                })?,
                details: serde_json::from_str(&row.details).map_err(|e| {
                    PersistenceError::Corrupt(format!("{dimension} details: {e}"))
                })?,
                raw_response: row.raw_response.unwrap_or_default(),
            }),
            "unavailable" => DimensionOutcome::Unavailable(AnalysisFailure {
                kind: row
                    .failure_kind
                    .as_deref()
                    .map_or(FailureKind::Internal, FailureKind::parse),
                message: row.failure_message.unwrap_or_default(),
            }),
            other => {
                return Err(PersistenceError::Corrupt(format!(
                    "{dimension} has unknown outcome '{other}'"
                )));
            }
        };

        Ok(Self {
            dimension,
            outcome,
            stored_at: row.stored_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub session_id: String,
    pub url_digest: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: String,
    pub embedding: Option<Vec<u8>>,
    pub stored_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = PersistenceError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let session_id = row
            .session_id
            .parse()
            .map_err(|e| PersistenceError::Corrupt(format!("document session id: {e}")))?;
        let embedding = row.embedding.as_deref().map(decode_embedding).transpose()?;

        Ok(Self {
            session_id,
            url_digest: row.url_digest,
            title: row.title,
            language: row.language,
            content: row.content,
            embedding,
            stored_at: row.stored_at,
        })
    }
}

/// Little-endian `f32` sequence.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, PersistenceError> {
    if bytes.len() % 4 != 0 {
        return Err(PersistenceError::Corrupt(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
