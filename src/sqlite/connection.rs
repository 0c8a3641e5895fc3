use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

use super::config::{SqliteOptions, open_core};
use crate::context::QueryContext;
use crate::error::{Phase, SqlHelperError};
use crate::handle::ConnectionHandle;

/// Virtual machine steps between context checks inside a running statement.
const PROGRESS_INTERVAL_OPS: i32 = 1000;

/// A rusqlite connection plus the handle used to interrupt it from another thread.
pub struct SqliteCore {
    conn: Mutex<rusqlite::Connection>,
    interrupt: rusqlite::InterruptHandle,
}

impl SqliteCore {
    pub(crate) fn new(conn: rusqlite::Connection) -> Self {
        let interrupt = conn.get_interrupt_handle();
        Self {
            conn: Mutex::new(conn),
            interrupt,
        }
    }
}

impl fmt::Debug for SqliteCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCore").finish_non_exhaustive()
    }
}

pub type SharedSqliteConnection = Arc<SqliteCore>;

/// A single shared `SQLite` connection usable as a [`ConnectionHandle`].
///
/// Clones share the same underlying connection; calls are serialized on it.
#[derive(Clone)]
pub struct SqliteConnection {
    core: SharedSqliteConnection,
}

impl SqliteConnection {
    /// Open a file database with default options.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError::ConnectionError` if the database cannot be opened.
    pub fn open(db_path: impl Into<String>) -> Result<Self, SqlHelperError> {
        Self::open_with(&SqliteOptions::new(db_path))
    }

    /// # Errors
    ///
    /// Returns `SqlHelperError::ConnectionError` if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, SqlHelperError> {
        Self::open_with(&SqliteOptions::new(":memory:"))
    }

    /// # Errors
    ///
    /// Returns `SqlHelperError::ConnectionError` if the database cannot be opened.
    pub fn open_with(options: &SqliteOptions) -> Result<Self, SqlHelperError> {
        Ok(Self {
            core: Arc::new(open_core(options)?),
        })
    }

    /// Wrap a connection the caller already configured.
    #[must_use]
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            core: Arc::new(SqliteCore::new(conn)),
        }
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("shared_with", &Arc::strong_count(&self.core))
            .finish()
    }
}

impl ConnectionHandle for SqliteConnection {
    async fn run<F, R>(&self, ctx: &QueryContext, phase: Phase, func: F) -> Result<R, SqlHelperError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlHelperError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(Arc::clone(&self.core), ctx, phase, func).await
    }
}

/// Run synchronous rusqlite work on the blocking pool, bounded by `ctx`.
///
/// When the context finishes first the in-flight statement is interrupted and
/// `Aborted` is returned without waiting for the worker. Statements run under
/// a progress handler that polls `ctx`, so work that starts after the context
/// finished still stops and releases the connection.
pub(crate) async fn run_blocking<F, R>(
    core: SharedSqliteConnection,
    ctx: &QueryContext,
    phase: Phase,
    func: F,
) -> Result<R, SqlHelperError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlHelperError> + Send + 'static,
    R: Send + 'static,
{
    if let Some(reason) = ctx.err() {
        return Err(SqlHelperError::aborted(phase, reason));
    }

    let active = Arc::new(AtomicBool::new(false));
    let worker_active = Arc::clone(&active);
    let worker_ctx = ctx.clone();
    let worker_core = Arc::clone(&core);
    let task = spawn_blocking(move || {
        let mut guard = worker_core.conn.blocking_lock();
        worker_active.store(true, Ordering::SeqCst);
        // the caller may have given up while we waited for the lock
        let out = match worker_ctx.err() {
            Some(reason) => Err(SqlHelperError::aborted(phase, reason)),
            None => {
                // statements started after an interrupt() call never see it, so
                // every statement also polls the context itself
                let watch = AssertUnwindSafe(worker_ctx);
                guard.progress_handler(PROGRESS_INTERVAL_OPS, Some(move || watch.is_done()));
                let out = func(&mut guard);
                guard.progress_handler(0, None::<fn() -> bool>);
                out
            }
        };
        worker_active.store(false, Ordering::SeqCst);
        out
    });

    tokio::select! {
        joined = task => joined.map_err(|e| {
            SqlHelperError::Other(format!("sqlite spawn_blocking join error: {e}"))
        })?,
        reason = ctx.done() => {
            if active.load(Ordering::SeqCst) {
                core.interrupt.interrupt();
            }
            tracing::warn!(%phase, %reason, "sqlite call aborted");
            Err(SqlHelperError::aborted(phase, reason))
        }
    }
}
