//! Thin async helper over rusqlite for tests and operational scripts.
//!
//! [`QueryHelper`] borrows a [`ConnectionHandle`] (a single
//! [`SqliteConnection`](sqlite::SqliteConnection) or a bb8-backed
//! [`SqlitePool`](sqlite::SqlitePool)) and offers three round trips:
//!
//! - [`bulk_query`](QueryHelper::bulk_query) prints every row to a writer,
//! - [`query_one`](QueryHelper::query_one) decodes one row into typed slots,
//! - [`execute`](QueryHelper::execute) runs a statement with bind parameters.
//!
//! Every call takes a [`QueryContext`]; cancelling it or letting its deadline
//! pass aborts the call and interrupts the running statement.

pub mod context;
pub mod error;
pub mod handle;
pub mod helper;
pub mod prelude;
pub mod results;
pub mod scan;
pub mod sqlite;
pub mod types;

pub use context::{AbortReason, QueryContext};
pub use error::{Phase, SqlHelperError};
pub use handle::ConnectionHandle;
pub use helper::QueryHelper;
pub use results::{CustomDbRow, ResultSet};
pub use scan::Destinations;
pub use types::RowValues;
