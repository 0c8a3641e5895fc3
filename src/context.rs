//! Cancellation context for helper calls.
//!
//! A [`QueryContext`] carries a cancellation flag and an optional deadline.
//! Every helper operation checks it before touching the database and races the
//! database work against it, so a cancelled or expired context aborts the call
//! promptly instead of waiting for the query to finish.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`QueryContext`] is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// [`QueryContext::cancel`] was called on this context or a parent.
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("context cancelled"),
            AbortReason::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Caller-controlled cancellation signal with an optional deadline.
///
/// Clones share the same cancellation state:
/// ```rust
/// use std::time::Duration;
/// use sql_helper::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = QueryContext::with_timeout(Duration::from_secs(5));
/// let other = ctx.clone();
/// other.cancel();
/// assert_eq!(ctx.err(), Some(AbortReason::Cancelled));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl QueryContext {
    /// A context that is never done unless cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that is cancelled with this one, but can also be
    /// cancelled on its own. The deadline is the earlier of the two.
    #[must_use]
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is done, or `None` while it is still live.
    /// Explicit cancellation takes precedence over an elapsed deadline.
    #[must_use]
    pub fn err(&self) -> Option<AbortReason> {
        if self.token.is_cancelled() {
            return Some(AbortReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(AbortReason::DeadlineExceeded),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> AbortReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => AbortReason::Cancelled,
                    () = tokio::time::sleep_until(deadline) => AbortReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                AbortReason::Cancelled
            }
        }
    }
}
