use sql_helper::prelude::*;

async fn seeded() -> Result<SqliteConnection, SqlHelperError> {
    let conn = SqliteConnection::open_in_memory()?;
    QueryHelper::new(&conn)
        .execute_batch(
            &QueryContext::new(),
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL);
             INSERT INTO t VALUES (1, 'a', 1.5), (2, 'b', NULL);",
        )
        .await?;
    Ok(conn)
}

#[tokio::test]
async fn decodes_columns_positionally() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let helper = QueryHelper::new(&conn);
    let ctx = QueryContext::new();

    let (mut id, mut name, mut score) = (0_i64, String::new(), None::<f64>);
    helper
        .query_one(
            &ctx,
            "SELECT id, name, score FROM t WHERE id = 1",
            (&mut id, &mut name, &mut score),
        )
        .await?;
    assert_eq!((id, name.as_str(), score), (1, "a", Some(1.5)));

    helper
        .query_one(&ctx, "SELECT score FROM t WHERE id = 2", &mut score)
        .await?;
    assert_eq!(score, None);

    let mut count = 0_u32;
    helper
        .query_one(&ctx, "SELECT count(*) FROM t", &mut count)
        .await?;
    assert_eq!(count, 2);
    Ok(())
}

#[tokio::test]
async fn only_first_row_is_used() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let mut name = String::new();
    QueryHelper::new(&conn)
        .query_one(&QueryContext::new(), "SELECT name FROM t ORDER BY id DESC", &mut name)
        .await?;
    assert_eq!(name, "b");
    Ok(())
}

#[tokio::test]
async fn no_rows_is_a_scan_error() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let mut name = String::from("untouched");
    let err = QueryHelper::new(&conn)
        .query_one(&QueryContext::new(), "SELECT name FROM t WHERE id = 99", &mut name)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SqlHelperError::Scan(rusqlite::Error::QueryReturnedNoRows)),
        "got {err:?}"
    );
    assert_eq!(name, "untouched");
    Ok(())
}

#[tokio::test]
async fn destination_count_must_match() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let (mut id, mut name) = (7_i64, String::from("untouched"));
    let err = QueryHelper::new(&conn)
        .query_one(
            &QueryContext::new(),
            "SELECT id, name, score FROM t WHERE id = 1",
            (&mut id, &mut name),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            SqlHelperError::ColumnCountMismatch {
                expected: 2,
                actual: 3
            }
        ),
        "got {err:?}"
    );
    assert_eq!(err.phase(), Some(Phase::Scan));
    assert_eq!((id, name.as_str()), (7, "untouched"));
    Ok(())
}

#[tokio::test]
async fn failures_are_classified() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded().await?;
    let helper = QueryHelper::new(&conn);
    let ctx = QueryContext::new();

    let mut id = 0_i64;
    let err = helper
        .query_one(&ctx, "SELECT id FROM nowhere", &mut id)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlHelperError::Query(_)), "got {err:?}");

    let err = helper
        .query_one(&ctx, "SELECT name FROM t WHERE id = 1", &mut id)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlHelperError::Scan(_)), "got {err:?}");
    assert_eq!(id, 0);
    Ok(())
}
