use std::time::{Duration, Instant};

use sql_helper::prelude::*;

const ENDLESS_COUNT: &str =
    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c";
const ENDLESS_ROWS: &str =
    "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c";

async fn seeded() -> Result<SqliteConnection, SqlHelperError> {
    let conn = SqliteConnection::open_in_memory()?;
    QueryHelper::new(&conn)
        .execute_batch(
            &QueryContext::new(),
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO t VALUES (1, 'a');",
        )
        .await?;
    Ok(conn)
}

fn assert_aborted(err: &SqlHelperError, phase: Phase, reason: AbortReason) {
    match err {
        SqlHelperError::Aborted {
            phase: got_phase,
            reason: got_reason,
        } => {
            assert_eq!(*got_phase, phase);
            assert_eq!(*got_reason, reason);
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_context_fails_every_operation() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let helper = QueryHelper::new(&conn);
    let ctx = QueryContext::new();
    ctx.cancel();

    let mut out = Vec::new();
    let err = helper.bulk_query(&ctx, "SELECT * FROM t", &mut out).await.unwrap_err();
    assert_aborted(&err, Phase::Query, AbortReason::Cancelled);
    assert!(out.is_empty());

    let mut id = 0_i64;
    let err = helper.query_one(&ctx, "SELECT id FROM t", &mut id).await.unwrap_err();
    assert_aborted(&err, Phase::Query, AbortReason::Cancelled);

    let err = helper
        .execute(&ctx, "INSERT INTO t VALUES (2, 'b')", &[])
        .await
        .unwrap_err();
    assert_aborted(&err, Phase::Execute, AbortReason::Cancelled);
    assert!(err.is_aborted());

    // nothing reached the database
    helper
        .query_one(&QueryContext::new(), "SELECT count(*) FROM t", &mut id)
        .await?;
    assert_eq!(id, 1);
    Ok(())
}

#[tokio::test]
async fn expired_deadline_fails_before_running() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let ctx = QueryContext::with_timeout(Duration::ZERO);
    let err = QueryHelper::new(&conn)
        .execute(&ctx, "DELETE FROM t", &[])
        .await
        .unwrap_err();
    assert_aborted(&err, Phase::Execute, AbortReason::DeadlineExceeded);
    assert_eq!(err.to_string(), "execute aborted: context deadline exceeded");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_interrupts_a_running_query() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let helper = QueryHelper::new(&conn);

    let started = Instant::now();
    let ctx = QueryContext::with_timeout(Duration::from_millis(200));
    let mut total = 0_i64;
    let err = helper
        .query_one(&ctx, ENDLESS_COUNT, &mut total)
        .await
        .unwrap_err();
    assert_aborted(&err, Phase::Query, AbortReason::DeadlineExceeded);
    assert!(started.elapsed() < Duration::from_secs(5));

    // the interrupted statement gave the connection back
    let fresh = QueryContext::with_timeout(Duration::from_secs(5));
    let mut name = String::new();
    helper
        .query_one(&fresh, "SELECT name FROM t WHERE id = 1", &mut name)
        .await?;
    assert_eq!(name, "a");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_a_streaming_query() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let helper = QueryHelper::new(&conn);

    let ctx = QueryContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let mut sink = tokio::io::sink();
    let err = helper
        .bulk_query(&ctx, ENDLESS_ROWS, &mut sink)
        .await
        .unwrap_err();
    assert_aborted(&err, Phase::Query, AbortReason::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));

    let mut out = Vec::new();
    helper
        .bulk_query(&QueryContext::new(), "SELECT id, name FROM t", &mut out)
        .await?;
    assert_eq!(out, b"[1 a]\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn statement_started_after_the_deadline_still_stops() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;

    // the deadline passes while the worker holds the connection but before
    // its statement begins, so there is nothing running to interrupt yet
    let ctx = QueryContext::with_timeout(Duration::from_millis(100));
    let err = conn
        .run(&ctx, Phase::Query, |c| {
            std::thread::sleep(Duration::from_millis(300));
            c.query_row(ENDLESS_COUNT, [], |r| r.get::<_, i64>(0))
                .map_err(SqlHelperError::Query)
        })
        .await
        .unwrap_err();
    assert_aborted(&err, Phase::Query, AbortReason::DeadlineExceeded);

    let started = Instant::now();
    let fresh = QueryContext::with_timeout(Duration::from_secs(3));
    let mut one = 0_i64;
    QueryHelper::new(&conn)
        .query_one(&fresh, "SELECT 1", &mut one)
        .await?;
    assert_eq!(one, 1);
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}
