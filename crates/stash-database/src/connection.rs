//! SQLite connection pool management.

use std::path::Path;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::info;

use stash_core::config::DatabaseConfig;
use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;

/// Cheaply cloneable handle to the metadata database.
///
/// The pool holds a single connection. SQLite admits one writer at a time,
/// so every transaction (interval shifts, insert-if-absent checks) runs to
/// completion before the next one starts.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database described by `config`, creating the file and
    /// applying pending migrations. Without a path the database lives in
    /// memory.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        let Some(path) = config.path.as_deref() else {
            info!("Opening in-memory metadata database");
            return Self::in_memory().await;
        };

        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to create database directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        info!(path = %path, "Opening metadata database");
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to open database {path}: {e}"),
                    e,
                )
            })?;

        Self::migrate(pool).await
    }

    /// An empty database that is never persisted.
    pub async fn in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        // The data lives and dies with the one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to open in-memory database", e)
            })?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> AppResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to run migrations: {e}"),
                    e,
                )
            })?;
        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    /// Close the pool, flushing the write-ahead log.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Metadata database closed");
    }

    pub(crate) async fn acquire(&self) -> AppResult<PoolConnection<Sqlite>> {
        self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire a connection", e)
        })
    }

    pub(crate) async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })
    }
}

/// Commit `tx`, mapping failures into the application error.
pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
}

/// Build a mapper from a failed query to a database error.
pub(crate) fn query_failed(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}
