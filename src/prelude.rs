//! Convenient imports for common functionality.

pub use crate::context::{AbortReason, QueryContext};
pub use crate::error::{Phase, SqlHelperError};
pub use crate::handle::ConnectionHandle;
pub use crate::helper::QueryHelper;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::scan::Destinations;
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder, SqlitePool};
pub use crate::types::RowValues;
