use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use super::{
    DocumentRepositoryTrait, PersistenceError, SessionRepositoryTrait, SqliteDocumentRepository,
    SqliteSessionRepository,
};
use crate::analysis::{Dimension, DimensionOutcome};
use crate::entities::{NewDocument, Session, SessionId, SessionStatus, StoredResult};
use crate::scoring::ReadabilityMetrics;

/// One async mutex per session id. Entries are dropped once no writer holds
/// or waits on them.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<DashMap<SessionId, Arc<Mutex<()>>>>,
}

pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: SessionId,
    locks: Arc<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub async fn lock(&self, id: SessionId) -> SessionGuard {
        let mutex = Arc::clone(self.inner.entry(id).or_default().value());
        let guard = mutex.lock_owned().await;
        SessionGuard {
            guard: Some(guard),
            id,
            locks: Arc::clone(&self.inner),
        }
    }

    /// Sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references an idle mutex
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Both stores behind one handle, with writes serialized per session.
#[derive(Clone)]
pub struct Persistence {
    sessions: Arc<dyn SessionRepositoryTrait>,
    documents: Arc<dyn DocumentRepositoryTrait>,
    locks: SessionLocks,
}

impl Persistence {
    pub fn new(
        sessions: Arc<dyn SessionRepositoryTrait>,
        documents: Arc<dyn DocumentRepositoryTrait>,
    ) -> Self {
        Self {
            sessions,
            documents,
            locks: SessionLocks::default(),
        }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self::new(
            Arc::new(SqliteSessionRepository::new(pool.clone())),
            Arc::new(SqliteDocumentRepository::new(pool)),
        )
    }

    pub fn sessions(&self) -> &dyn SessionRepositoryTrait {
        self.sessions.as_ref()
    }

    pub fn documents(&self) -> &dyn DocumentRepositoryTrait {
        self.documents.as_ref()
    }

    pub fn locks(&self) -> &SessionLocks {
        &self.locks
    }

    #[instrument(skip(self, readability))]
    pub async fn create_session(
        &self,
        url: &str,
        title: Option<&str>,
        readability: &ReadabilityMetrics,
    ) -> Result<Session, PersistenceError> {
        let session = self.sessions.create_session(url, title, readability).await?;
        debug!(session_id = %session.id, "session created");
        Ok(session)
    }

    pub async fn put_document(
        &self,
        session_id: SessionId,
        document: &NewDocument,
    ) -> Result<(), PersistenceError> {
        let _guard = self.locks.lock(session_id).await;
        self.documents.put_document(session_id, document).await
    }

    /// Stores every outcome, then the resulting status, under one lock.
    #[instrument(skip(self, outcomes))]
    pub async fn store_report<'a, I>(
        &self,
        session_id: SessionId,
        outcomes: I,
    ) -> Result<SessionStatus, PersistenceError>
    where
        I: IntoIterator<Item = (&'a Dimension, &'a DimensionOutcome)> + Send,
        I::IntoIter: Send,
    {
        let _guard = self.locks.lock(session_id).await;
        for (dimension, outcome) in outcomes {
            self.sessions
                .store_analysis(session_id, *dimension, outcome)
                .await?;
        }
        self.refresh_status(session_id).await
    }

    /// Overwrites one dimension and recomputes the session status.
    #[instrument(skip(self, outcome))]
    pub async fn replace_dimension(
        &self,
        session_id: SessionId,
        dimension: Dimension,
        outcome: &DimensionOutcome,
    ) -> Result<SessionStatus, PersistenceError> {
        let _guard = self.locks.lock(session_id).await;
        self.sessions
            .store_analysis(session_id, dimension, outcome)
            .await?;
        self.refresh_status(session_id).await
    }

    pub async fn set_status(
        &self,
        session_id: SessionId,
        status: SessionStatus,
    ) -> Result<(), PersistenceError> {
        let _guard = self.locks.lock(session_id).await;
        self.sessions.set_status(session_id, status).await
    }

    pub async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, PersistenceError> {
        self.sessions.get_session(session_id).await
    }

    pub async fn get_results(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<StoredResult>, PersistenceError> {
        self.sessions.get_results(session_id).await
    }

    /// Caller holds the session lock.
    async fn refresh_status(&self, session_id: SessionId) -> Result<SessionStatus, PersistenceError> {
        let results = self.sessions.get_results(session_id).await?;
        let completed = results.iter().filter(|r| r.outcome.is_completed()).count();
        let status = SessionStatus::from_counts(completed, Dimension::ALL.len());
        self.sessions.set_status(session_id, status).await?;
        Ok(status)
    }
}
