use std::future::Future;

use crate::context::QueryContext;
use crate::error::{Phase, SqlHelperError};

/// A live connection or pool that can run one context-scoped round trip.
///
/// The helper never owns a handle; callers keep it alive and decide when to
/// close it. Implementations must:
/// - fail with [`SqlHelperError::Aborted`] without touching the database when
///   `ctx` is already done,
/// - stop waiting and return `Aborted` as soon as `ctx` finishes mid-call,
/// - release the connection (or pool checkout) before returning.
pub trait ConnectionHandle: Send + Sync {
    /// Run `func` against a connection. `phase` labels an abort.
    fn run<F, R>(
        &self,
        ctx: &QueryContext,
        phase: Phase,
        func: F,
    ) -> impl Future<Output = Result<R, SqlHelperError>> + Send
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlHelperError> + Send + 'static,
        R: Send + 'static;
}
