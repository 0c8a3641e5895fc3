//! Blocking tasks executed on a rusqlite connection.
//!
//! The task builders are free functions so the closures they return are
//! `'static` no matter what the calling helper borrows.

use std::ops::ControlFlow;

use rusqlite::types::Value;
use rusqlite::{Row, Statement, params_from_iter};
use tokio::sync::mpsc::Sender;

use super::params::Params;
use crate::error::SqlHelperError;
use crate::results::ResultSet;
use crate::types::RowValues;

#[must_use]
pub fn sqlite_value_to_row_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlHelperError::Scan` if the column cannot be read.
pub fn sqlite_extract_value_sync(row: &Row<'_>, idx: usize) -> Result<RowValues, SqlHelperError> {
    let value: Value = row.get(idx).map_err(SqlHelperError::Scan)?;
    Ok(sqlite_value_to_row_value(value))
}

fn column_names(stmt: &Statement<'_>) -> Result<Vec<String>, SqlHelperError> {
    (0..stmt.column_count())
        .map(|i| {
            stmt.column_name(i)
                .map(str::to_owned)
                .map_err(SqlHelperError::Schema)
        })
        .collect()
}

/// Prepare `sql`, then hand each decoded row to `on_row` until the rows run
/// out or `on_row` breaks. Returns the column names.
///
/// A failure on the first step means the query itself failed; later step
/// failures are cursor errors.
pub(crate) fn scan_rows<F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &Params,
    mut on_row: F,
) -> Result<Vec<String>, SqlHelperError>
where
    F: FnMut(Vec<RowValues>) -> ControlFlow<()>,
{
    let mut stmt = conn.prepare(sql).map_err(SqlHelperError::Query)?;
    let columns = column_names(&stmt)?;
    let mut rows = stmt
        .query(params_from_iter(params.as_values()))
        .map_err(SqlHelperError::Query)?;

    let mut first = true;
    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) if first => return Err(SqlHelperError::Query(e)),
            Err(e) => return Err(SqlHelperError::Cursor(e)),
        };
        first = false;

        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(sqlite_extract_value_sync(row, i)?);
        }
        if on_row(values).is_break() {
            break;
        }
    }
    Ok(columns)
}

/// Stream every row over `tx`. A closed receiver stops the scan quietly.
pub(crate) fn stream_task(
    sql: String,
    tx: Sender<Vec<RowValues>>,
) -> impl FnOnce(&mut rusqlite::Connection) -> Result<(), SqlHelperError> + Send + 'static {
    move |conn| {
        scan_rows(conn, &sql, &Params::default(), |values| {
            match tx.blocking_send(values) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        })?;
        Ok(())
    }
}

pub(crate) fn select_task(
    sql: String,
    params: Params,
) -> impl FnOnce(&mut rusqlite::Connection) -> Result<ResultSet, SqlHelperError> + Send + 'static {
    move |conn| {
        let mut rows = Vec::new();
        let columns = scan_rows(conn, &sql, &params, |values| {
            rows.push(values);
            ControlFlow::Continue(())
        })?;
        let mut result_set = ResultSet::new(columns);
        for values in rows {
            result_set.add_row_values(values);
        }
        Ok(result_set)
    }
}

/// Decode the first row positionally; further rows are ignored.
pub(crate) fn single_row_task<V>(
    sql: String,
    arity: usize,
    decode: fn(&Row<'_>) -> Result<V, SqlHelperError>,
) -> impl FnOnce(&mut rusqlite::Connection) -> Result<V, SqlHelperError> + Send + 'static
where
    V: Send + 'static,
{
    move |conn| {
        let mut stmt = conn.prepare(&sql).map_err(SqlHelperError::Query)?;
        let actual = stmt.column_count();
        let mut rows = stmt.query([]).map_err(SqlHelperError::Query)?;
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(SqlHelperError::Scan(rusqlite::Error::QueryReturnedNoRows));
            }
            Err(e) => return Err(SqlHelperError::Query(e)),
        };
        if actual != arity {
            return Err(SqlHelperError::ColumnCountMismatch {
                expected: arity,
                actual,
            });
        }
        decode(row)
    }
}

pub(crate) fn execute_task(
    sql: String,
    params: Params,
) -> impl FnOnce(&mut rusqlite::Connection) -> Result<(), SqlHelperError> + Send + 'static {
    move |conn| {
        let mut stmt = conn.prepare(&sql).map_err(SqlHelperError::Execution)?;
        stmt.execute(params_from_iter(params.as_values()))
            .map_err(SqlHelperError::Execution)?;
        Ok(())
    }
}

pub(crate) fn batch_task(
    sql: String,
) -> impl FnOnce(&mut rusqlite::Connection) -> Result<(), SqlHelperError> + Send + 'static {
    move |conn| conn.execute_batch(&sql).map_err(SqlHelperError::Execution)
}
