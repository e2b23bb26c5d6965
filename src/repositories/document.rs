use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::PersistenceError;
use crate::entities::{DocumentRow, NewDocument, SessionId, StoredDocument, encode_embedding};

/// Document store: extracted text plus its embedding, keyed by session.
#[async_trait]
pub trait DocumentRepositoryTrait: Send + Sync {
    async fn put_document(
        &self,
        session_id: SessionId,
        document: &NewDocument,
    ) -> Result<(), PersistenceError>;

    async fn get_document(
        &self,
        session_id: SessionId,
    ) -> Result<Option<StoredDocument>, PersistenceError>;
}

#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Hex MD5 of the source URL.
pub fn url_digest(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

#[async_trait]
impl DocumentRepositoryTrait for SqliteDocumentRepository {
    async fn put_document(
        &self,
        session_id: SessionId,
        document: &NewDocument,
    ) -> Result<(), PersistenceError> {
        let embedding = document.embedding.as_deref().map(encode_embedding);
        let dimensions = document.embedding.as_ref().map(|v| v.len() as i64);

        sqlx::query(
            r#"
            INSERT INTO documents
                  (session_id, url_digest, title, language, content, embedding, dimensions, stored_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (session_id) DO UPDATE
              SET url_digest = excluded.url_digest,
                  title      = excluded.title,
                  language   = excluded.language,
                  content    = excluded.content,
                  embedding  = excluded.embedding,
                  dimensions = excluded.dimensions,
                  stored_at  = excluded.stored_at
            "#,
        )
        .bind(session_id.to_string())
        .bind(url_digest(&document.url))
        .bind(&document.title)
        .bind(&document.language)
        .bind(&document.content)
        .bind(embedding)
        .bind(dimensions)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(
        &self,
        session_id: SessionId,
    ) -> Result<Option<StoredDocument>, PersistenceError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            SELECT session_id, url_digest, title, language, content, embedding, stored_at
            FROM documents
            WHERE session_id = ?
            "#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredDocument::try_from).transpose()
    }
}
