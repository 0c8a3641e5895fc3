use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rusqlite::types::Value;
use tracing_subscriber::EnvFilter;

use sql_helper::prelude::*;
use sql_helper::sqlite::sqlite_value_to_row_value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run ad-hoc SQL against a SQLite database")]
struct Args {
    /// Path to the SQLite database file
    #[arg(long)]
    db: String,
    /// Abort the call after this long (e.g. `500ms`, `10s`)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    #[arg(long, default_value_t = 1)]
    pool_size: u32,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every row of a query, one line per row
    Query { sql: String },
    /// Print the single value of a one-column, one-row query
    One { sql: String },
    /// Execute a statement with positional parameters
    Exec {
        sql: String,
        /// Bind parameter; integers, floats and `null` are recognized, anything else is text
        #[arg(long = "param")]
        params: Vec<String>,
    },
}

fn parse_param(raw: &str) -> RowValues {
    if let Ok(i) = raw.parse::<i64>() {
        RowValues::Int(i)
    } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
        RowValues::Float(f)
    } else if raw.eq_ignore_ascii_case("null") {
        RowValues::Null
    } else {
        RowValues::Text(raw.to_string())
    }
}

async fn run(args: Args) -> Result<(), SqlHelperError> {
    let pool = SqlitePool::builder(args.db.clone())
        .pool_size(args.pool_size)
        .build()
        .await?;
    let helper = QueryHelper::new(&pool);

    let ctx = match args.timeout {
        Some(timeout) => QueryContext::with_timeout(timeout),
        None => QueryContext::new(),
    };
    let interrupt_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            interrupt_ctx.cancel();
        }
    });

    match args.command {
        Command::Query { sql } => {
            let mut stdout = tokio::io::stdout();
            helper.bulk_query(&ctx, &sql, &mut stdout).await?;
        }
        Command::One { sql } => {
            let mut value = Value::Null;
            helper.query_one(&ctx, &sql, &mut value).await?;
            println!("{}", sqlite_value_to_row_value(value));
        }
        Command::Exec { sql, params } => {
            let params: Vec<RowValues> = params.iter().map(|p| parse_param(p)).collect();
            helper.execute(&ctx, &sql, &params).await?;
            tracing::info!("statement executed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_by_shape() {
        assert_eq!(parse_param("3"), RowValues::Int(3));
        assert_eq!(parse_param("2.5"), RowValues::Float(2.5));
        assert_eq!(parse_param("NULL"), RowValues::Null);
        assert_eq!(parse_param("c"), RowValues::Text("c".into()));
        // only finite numbers bind as floats
        assert_eq!(parse_param("NaN"), RowValues::Text("NaN".into()));
        assert_eq!(parse_param("inf"), RowValues::Text("inf".into()));
        assert_eq!(parse_param("-Infinity"), RowValues::Text("-Infinity".into()));
        assert_eq!(parse_param("1e3"), RowValues::Float(1000.0));
    }

    #[test]
    fn cli_parses_exec_params() {
        let args = Args::parse_from([
            "sql-helper", "--db", "t.db", "--timeout", "2s", "exec",
            "INSERT INTO t VALUES (?, ?)", "--param", "3", "--param", "c",
        ]);
        assert_eq!(args.timeout, Some(Duration::from_secs(2)));
        match args.command {
            Command::Exec { params, .. } => assert_eq!(params, ["3", "c"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
