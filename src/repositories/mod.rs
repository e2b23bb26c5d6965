pub mod document;
pub mod persistence;
pub mod session;

pub use document::{DocumentRepositoryTrait, SqliteDocumentRepository};
pub use persistence::{Persistence, SessionLocks};
pub use session::{SessionRepositoryTrait, SqliteSessionRepository};

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::entities::SessionId;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("could not encode value for storage: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens a pool for `database_url`, creating the file and its directory when
/// missing. In-memory databases get a single, never-recycled connection so
/// every query sees the same database.
pub async fn connect(database_url: &str) -> Result<SqlitePool, PersistenceError> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let options = if in_memory {
        options
    } else {
        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    Ok(pool_options.connect_with(options).await?)
}

/// Applies the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), PersistenceError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.expect("open in-memory db");
    migrate(&pool).await.expect("run migrations");
    pool
}
