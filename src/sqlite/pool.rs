use std::fmt;
use std::sync::Arc;

use bb8::Pool;

use super::config::{SqliteManager, SqliteOptions, SqliteOptionsBuilder};
use super::connection::run_blocking;
use crate::context::QueryContext;
use crate::error::{Phase, SqlHelperError};
use crate::handle::ConnectionHandle;

/// A bb8 pool of `SQLite` connections usable as a [`ConnectionHandle`].
///
/// Each helper call checks out one connection for the length of the call.
#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteManager>,
}

impl SqlitePool {
    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Create the pool and open its first connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError::ConfigError` for invalid options and
    /// `SqlHelperError::ConnectionError` if the database cannot be opened.
    pub async fn new(options: SqliteOptions) -> Result<Self, SqlHelperError> {
        options.validate()?;
        let pool_size = options.pool_size;
        let checkout_timeout = options.checkout_timeout;
        let path = options.db_path.clone();

        let pool = Pool::builder()
            .max_size(pool_size)
            .min_idle(Some(1))
            .connection_timeout(checkout_timeout)
            .test_on_check_out(false)
            .build(SqliteManager::new(options))
            .await?;

        tracing::debug!(path = %path, pool_size, "sqlite pool ready");
        Ok(Self { pool })
    }

    /// Snapshot of open and idle connections.
    #[must_use]
    pub fn state(&self) -> bb8::State {
        self.pool.state()
    }
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("SqlitePool")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl ConnectionHandle for SqlitePool {
    async fn run<F, R>(&self, ctx: &QueryContext, phase: Phase, func: F) -> Result<R, SqlHelperError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlHelperError> + Send + 'static,
        R: Send + 'static,
    {
        if let Some(reason) = ctx.err() {
            return Err(SqlHelperError::aborted(phase, reason));
        }
        let pooled = tokio::select! {
            checked_out = self.pool.get() => checked_out?,
            reason = ctx.done() => return Err(SqlHelperError::aborted(phase, reason)),
        };
        run_blocking(Arc::clone(&*pooled), ctx, phase, func).await
    }
}
