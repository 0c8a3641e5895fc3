use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::context::QueryContext;
use crate::error::{Phase, SqlHelperError};
use crate::handle::ConnectionHandle;
use crate::results::ResultSet;
use crate::scan::Destinations;
use crate::sqlite::Params;
use crate::sqlite::query::{batch_task, execute_task, select_task, single_row_task, stream_task};
use crate::types::{RowValues, render_row};

const ROW_CHANNEL_CAPACITY: usize = 64;
const SQL_PREVIEW_CHARS: usize = 120;

/// Stateless façade over a borrowed [`ConnectionHandle`].
///
/// ```rust,no_run
/// use sql_helper::prelude::*;
///
/// # async fn demo() -> Result<(), SqlHelperError> {
/// let conn = SqliteConnection::open_in_memory()?;
/// let helper = QueryHelper::new(&conn);
/// let ctx = QueryContext::new();
///
/// helper.execute_batch(&ctx, "CREATE TABLE t (id INTEGER, name TEXT)").await?;
/// helper
///     .execute(&ctx, "INSERT INTO t (id, name) VALUES (?, ?)", &[RowValues::Int(1), RowValues::Text("a".into())])
///     .await?;
///
/// let mut out = Vec::new();
/// helper.bulk_query(&ctx, "SELECT id, name FROM t", &mut out).await?;
/// assert_eq!(out, b"[1 a]\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryHelper<'a, H> {
    handle: &'a H,
}

impl<H> Clone for QueryHelper<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for QueryHelper<'_, H> {}

impl<'a, H> QueryHelper<'a, H>
where
    H: ConnectionHandle,
{
    #[must_use]
    pub fn new(handle: &'a H) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> &'a H {
        self.handle
    }

    /// Run `query` and write every row to `out` as one `[v1 v2 ...]` line, in
    /// the order the database produces them.
    ///
    /// Rows are written as they arrive; on error, lines already written stay
    /// in `out` and processing stops.
    ///
    /// # Errors
    ///
    /// `Query`, `Schema`, `Scan` or `Cursor` for the failing step, `Write` if
    /// `out` rejects a line, `Aborted` if `ctx` finishes first.
    pub async fn bulk_query<W>(
        &self,
        ctx: &QueryContext,
        query: &str,
        out: &mut W,
    ) -> Result<(), SqlHelperError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        debug!(sql = %preview(query), "bulk query");
        let (tx, mut rx) = mpsc::channel::<Vec<RowValues>>(ROW_CHANNEL_CAPACITY);
        let fetch = self
            .handle
            .run(ctx, Phase::Query, stream_task(query.to_owned(), tx));
        // owns the receiver so a failed sink closes the channel and stops the worker
        let write = async move {
            let mut written = 0_usize;
            loop {
                let values = tokio::select! {
                    biased;
                    _ = ctx.done() => break,
                    values = rx.recv() => match values {
                        Some(values) => values,
                        None => break,
                    },
                };
                let mut line = render_row(&values);
                line.push('\n');
                out.write_all(line.as_bytes())
                    .await
                    .map_err(SqlHelperError::Write)?;
                written += 1;
            }
            out.flush().await.map_err(SqlHelperError::Write)?;
            Ok::<_, SqlHelperError>(written)
        };

        // rows sent before a fetch failure are still drained into `out`
        let (fetched, written) = tokio::join!(fetch, write);
        fetched?;
        let written = written?;
        debug!(rows = written, "bulk query done");
        Ok(())
    }

    /// Run `query` and decode its first row into `dest`, column by column.
    ///
    /// ```rust,no_run
    /// # use sql_helper::prelude::*;
    /// # async fn demo(helper: QueryHelper<'_, SqliteConnection>) -> Result<(), SqlHelperError> {
    /// let ctx = QueryContext::new();
    /// let (mut id, mut name) = (0_i64, String::new());
    /// helper
    ///     .query_one(&ctx, "SELECT id, name FROM t WHERE id = 1", (&mut id, &mut name))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// `Query` if the query cannot run; `Scan` if there is no row or a column
    /// does not decode; `ColumnCountMismatch` if the row width differs from
    /// the number of destinations. On error no destination is written.
    pub async fn query_one<D>(
        &self,
        ctx: &QueryContext,
        query: &str,
        dest: D,
    ) -> Result<(), SqlHelperError>
    where
        D: Destinations,
    {
        debug!(sql = %preview(query), destinations = D::ARITY, "single row query");
        let values = self
            .handle
            .run(
                ctx,
                Phase::Query,
                single_row_task::<D::Values>(query.to_owned(), D::ARITY, D::decode),
            )
            .await?;
        dest.assign(values);
        Ok(())
    }

    /// Run `statement` with positional `params`. Row counts and generated ids
    /// are discarded.
    ///
    /// # Errors
    ///
    /// `Execution` if the statement fails, `Aborted` if `ctx` finishes first.
    pub async fn execute(
        &self,
        ctx: &QueryContext,
        statement: &str,
        params: &[RowValues],
    ) -> Result<(), SqlHelperError> {
        debug!(sql = %preview(statement), params = params.len(), "execute");
        self.handle
            .run(
                ctx,
                Phase::Execute,
                execute_task(statement.to_owned(), Params::convert(params)),
            )
            .await
    }

    /// Run `query` and materialize the rows.
    ///
    /// # Errors
    ///
    /// Same classes as [`bulk_query`](Self::bulk_query), minus `Write`.
    pub async fn query_all(
        &self,
        ctx: &QueryContext,
        query: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlHelperError> {
        debug!(sql = %preview(query), params = params.len(), "query all");
        self.handle
            .run(
                ctx,
                Phase::Query,
                select_task(query.to_owned(), Params::convert(params)),
            )
            .await
    }

    /// Run a semicolon-separated script, e.g. schema setup for a test.
    ///
    /// # Errors
    ///
    /// `Execution` at the first failing statement; earlier statements stay applied.
    pub async fn execute_batch(&self, ctx: &QueryContext, sql: &str) -> Result<(), SqlHelperError> {
        debug!(sql = %preview(sql), "execute batch");
        self.handle
            .run(ctx, Phase::Execute, batch_task(sql.to_owned()))
            .await
    }
}

fn preview(sql: &str) -> &str {
    match sql.char_indices().nth(SQL_PREVIEW_CHARS) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}
