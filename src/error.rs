use std::fmt;

use thiserror::Error;

use crate::context::AbortReason;

/// The step of an operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Preparing or issuing a query.
    Query,
    /// Enumerating result column names.
    Schema,
    /// Decoding column values out of a row.
    Scan,
    /// Stepping the row cursor after iteration began.
    Cursor,
    /// Running a non-query statement.
    Execute,
    /// Writing a rendered row to the output sink.
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Query => "query",
            Phase::Schema => "column enumeration",
            Phase::Scan => "scan",
            Phase::Cursor => "rows cursor",
            Phase::Execute => "execute",
            Phase::Write => "write",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SqlHelperError {
    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("column enumeration failed: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("scan failed: {0}")]
    Scan(#[source] rusqlite::Error),

    #[error("scan failed: expected {expected} destination(s), row has {actual} column(s)")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("rows cursor failed: {0}")]
    Cursor(#[source] rusqlite::Error),

    #[error("execute failed: {0}")]
    Execution(#[source] rusqlite::Error),

    #[error("writing row failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("{phase} aborted: {reason}")]
    Aborted { phase: Phase, reason: AbortReason },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlHelperError {
    /// The step that failed, for errors raised by one of the helper operations.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Query(_) => Some(Phase::Query),
            Self::Schema(_) => Some(Phase::Schema),
            Self::Scan(_) | Self::ColumnCountMismatch { .. } => Some(Phase::Scan),
            Self::Cursor(_) => Some(Phase::Cursor),
            Self::Execution(_) => Some(Phase::Execute),
            Self::Write(_) => Some(Phase::Write),
            Self::Aborted { phase, .. } => Some(*phase),
            Self::ConnectionError(_) | Self::ConfigError(_) | Self::Other(_) => None,
        }
    }

    /// Whether the call was cut short by its [`QueryContext`](crate::QueryContext).
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    pub(crate) fn aborted(phase: Phase, reason: AbortReason) -> Self {
        Self::Aborted { phase, reason }
    }
}

impl From<bb8::RunError<SqlHelperError>> for SqlHelperError {
    fn from(err: bb8::RunError<SqlHelperError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlHelperError::ConnectionError("SQLite pool checkout timed out".to_string())
            }
        }
    }
}
