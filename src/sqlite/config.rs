use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::spawn_blocking;

use super::connection::{SharedSqliteConnection, SqliteCore, run_blocking};
use super::pool::SqlitePool;
use crate::context::QueryContext;
use crate::error::{Phase, SqlHelperError};

const MEMORY_PATH: &str = ":memory:";

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Maximum connections held by a [`SqlitePool`].
    pub pool_size: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Switch file databases to WAL journaling on open.
    pub journal_mode_wal: bool,
    /// How long a pool checkout may wait before giving up.
    pub checkout_timeout: Duration,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            pool_size: 4,
            busy_timeout: Duration::from_secs(5),
            journal_mode_wal: true,
            checkout_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.db_path == MEMORY_PATH
    }

    /// # Errors
    ///
    /// Returns `SqlHelperError::ConfigError` for an empty path, a zero pool size,
    /// or a pooled private in-memory database.
    pub fn validate(&self) -> Result<(), SqlHelperError> {
        if self.db_path.is_empty() {
            return Err(SqlHelperError::ConfigError(
                "SQLite database path is empty".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SqlHelperError::ConfigError(
                "SQLite pool size must be at least 1".to_string(),
            ));
        }
        // every pooled connection to ":memory:" would see its own empty database
        if self.db_path == MEMORY_PATH && self.pool_size > 1 {
            return Err(SqlHelperError::ConfigError(
                "a private in-memory SQLite database cannot be pooled; use pool_size 1 or SqliteConnection::open_in_memory".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn journal_mode_wal(mut self, enabled: bool) -> Self {
        self.opts.journal_mode_wal = enabled;
        self
    }

    #[must_use]
    pub fn checkout_timeout(mut self, timeout: Duration) -> Self {
        self.opts.checkout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a [`SqlitePool`] from these options.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError` if the options are invalid or the first connection cannot be opened.
    pub async fn build(self) -> Result<SqlitePool, SqlHelperError> {
        SqlitePool::new(self.finish()).await
    }
}

/// Open one connection and apply the per-connection pragmas.
pub(crate) fn open_core(opts: &SqliteOptions) -> Result<SqliteCore, SqlHelperError> {
    let conn = rusqlite::Connection::open(&opts.db_path).map_err(|e| {
        SqlHelperError::ConnectionError(format!(
            "failed to open SQLite database {}: {e}",
            opts.db_path
        ))
    })?;
    conn.busy_timeout(opts.busy_timeout).map_err(|e| {
        SqlHelperError::ConnectionError(format!("failed to set SQLite busy timeout: {e}"))
    })?;
    if opts.journal_mode_wal && !opts.is_memory() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| {
                SqlHelperError::ConnectionError(format!("failed to enable WAL journaling: {e}"))
            })?;
        tracing::debug!(path = %opts.db_path, journal_mode = %mode, "sqlite connection opened");
    }
    Ok(SqliteCore::new(conn))
}

/// bb8 manager that opens rusqlite connections with the configured pragmas.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    options: Arc<SqliteOptions>,
}

impl SqliteManager {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

#[async_trait]
impl bb8::ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlHelperError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let options = Arc::clone(&self.options);
        let core = spawn_blocking(move || open_core(&options))
            .await
            .map_err(|e| {
                SqlHelperError::ConnectionError(format!("sqlite connect join error: {e}"))
            })??;
        Ok(Arc::new(core))
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        run_blocking(
            Arc::clone(conn),
            &QueryContext::new(),
            Phase::Query,
            |guard| {
                guard.query_row("SELECT 1", [], |_| Ok(())).map_err(|e| {
                    SqlHelperError::ConnectionError(format!("sqlite liveness check failed: {e}"))
                })
            },
        )
        .await
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
