use presto_txn::driver::HttpMethod;
use presto_txn::driver::headers::PRESTO_STARTED_TRANSACTION_ID;
use presto_txn::prelude::*;
use presto_txn::test_utils::{
    ScriptedTransport, json_response, queued_page, rows_page, test_options,
};
use serde_json::json;

const PAGE_1: &str = "http://localhost:32767/v1/statement/q/1";
const PAGE_2: &str = "http://localhost:32767/v1/statement/q/2";

#[tokio::test]
async fn fetchall_follows_next_uri_until_finished() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());
    let cols = [("id", "integer"), ("name", "varchar")];

    transport.push(queued_page(PAGE_1, &[]));
    transport.push(rows_page(&cols, &json!([[1, "a"], [2, "b"]]), Some(PAGE_2)));
    transport.push(rows_page(&cols, &json!([[3, null]]), None));

    let mut cursor = conn.cursor();
    cursor.execute("select id, name from t", None).await?;
    assert_eq!(cursor.state(), CursorState::Running);

    let rows = cursor.fetchall().await?;
    assert_eq!(
        rows,
        vec![
            vec![RowValues::Int(1), RowValues::Text("a".into())],
            vec![RowValues::Int(2), RowValues::Text("b".into())],
            vec![RowValues::Int(3), RowValues::Null],
        ]
    );
    assert_eq!(cursor.state(), CursorState::Finished);
    assert_eq!(cursor.last_query_id(), Some("query_1"));

    let gets: Vec<String> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == HttpMethod::Get)
        .map(|r| r.url)
        .collect();
    assert_eq!(gets, vec![PAGE_1.to_string(), PAGE_2.to_string()]);
    Ok(())
}

#[tokio::test]
async fn fetchone_and_fetchmany_consume_buffered_rows() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(rows_page(
        &[("n", "bigint")],
        &json!([[1], [2], [3], [4]]),
        None,
    ));

    let mut cursor = conn.cursor();
    cursor.execute("select n from t", None).await?;
    assert_eq!(cursor.fetchone().await?, Some(vec![RowValues::Int(1)]));

    cursor.set_arraysize(2);
    assert_eq!(
        cursor.fetchmany(None).await?,
        vec![vec![RowValues::Int(2)], vec![RowValues::Int(3)]]
    );
    assert_eq!(cursor.fetchmany(Some(10)).await?, vec![vec![RowValues::Int(4)]]);
    assert_eq!(cursor.fetchone().await?, None);
    Ok(())
}

#[tokio::test]
async fn fetchmany_with_huge_size_returns_what_is_left() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(rows_page(&[("n", "bigint")], &json!([[1]]), Some(PAGE_1)));
    transport.push(rows_page(&[("n", "bigint")], &json!([[2]]), None));

    let mut cursor = conn.cursor();
    cursor.execute("select n from t", None).await?;
    assert_eq!(
        cursor.fetchmany(Some(usize::MAX)).await?,
        vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]]
    );

    cursor.execute("select n from t", None).await?;
    cursor.set_arraysize(usize::MAX);
    assert!(cursor.fetchmany(None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn description_waits_for_columns() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(queued_page(PAGE_1, &[]));
    transport.push(rows_page(&[("_col0", "integer")], &json!([[1]]), None));

    let mut cursor = conn.cursor();
    assert_eq!(cursor.description().await?, None);

    cursor.execute("select 1", None).await?;
    let description = cursor.description().await?.expect("columns");
    assert_eq!(description.len(), 1);
    assert_eq!(description[0].name, "_col0");
    assert_eq!(description[0].type_name, "integer");
    assert!(description[0].null_ok);
    Ok(())
}

#[tokio::test]
async fn fetch_before_execute_is_a_programming_error() {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    let mut cursor = conn.cursor();
    let err = cursor.fetchone().await.unwrap_err();
    assert!(matches!(err, PrestoTxnError::ProgrammingError(msg) if msg == "No query yet"));
    assert!(matches!(
        cursor.poll().await,
        Err(PrestoTxnError::ProgrammingError(_))
    ));
    assert!(matches!(
        cursor.cancel().await,
        Err(PrestoTxnError::ProgrammingError(_))
    ));
}

#[tokio::test]
async fn non_success_status_is_an_operational_error() {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(json_response(
        503,
        &json!({"message": "coordinator starting"}),
        &[],
    ));

    let err = conn
        .cursor()
        .execute("select 1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, PrestoTxnError::OperationalError(msg) if msg.contains("503")));
}

#[tokio::test]
async fn headers_are_observed_even_on_failing_responses() {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(json_response(
        500,
        &json!({}),
        &[(PRESTO_STARTED_TRANSACTION_ID, "T5")],
    ));

    assert!(conn.cursor().execute("start transaction", None).await.is_err());
    assert_eq!(conn.transaction().display_id(), "T5");
}

#[tokio::test]
async fn query_errors_surface_as_database_errors() {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(json_response(
        200,
        &json!({
            "id": "q",
            "stats": {"state": "FAILED"},
            "error": {"message": "Table memory.default.nope does not exist", "errorName": "TABLE_NOT_FOUND"}
        }),
        &[],
    ));

    let mut cursor = conn.cursor();
    let err = cursor.execute("select * from nope", None).await.unwrap_err();
    assert!(matches!(
        &err,
        PrestoTxnError::DatabaseError(msg) if msg.starts_with("TABLE_NOT_FOUND")
    ));
    assert_eq!(cursor.state(), CursorState::Finished);
}

#[tokio::test]
async fn malformed_body_is_a_json_error() {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(presto_txn::driver::TransportResponse {
        status: 200,
        headers: Default::default(),
        body: "<html>proxy error</html>".to_string(),
    });

    let err = conn.cursor().execute("select 1", None).await.unwrap_err();
    assert!(matches!(err, PrestoTxnError::JsonError(_)));
}

#[tokio::test]
async fn cancel_deletes_next_uri_once() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(queued_page(PAGE_1, &[]));
    let mut cursor = conn.cursor();
    cursor.execute("select * from big", None).await?;

    cursor.cancel().await?;
    assert_eq!(cursor.state(), CursorState::Finished);
    cursor.cancel().await?;

    let deletes: Vec<String> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == HttpMethod::Delete)
        .map(|r| r.url)
        .collect();
    assert_eq!(deletes, vec![PAGE_1.to_string()]);
    assert_eq!(cursor.fetchone().await?, None);
    Ok(())
}

#[tokio::test]
async fn poll_fetches_one_page_and_reports_stats() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(queued_page(PAGE_1, &[]));
    transport.push(rows_page(&[("n", "bigint")], &json!([[1]]), Some(PAGE_2)));
    transport.push(rows_page(&[("n", "bigint")], &json!([]), None));

    let mut cursor = conn.cursor();
    cursor.execute("select n from t", None).await?;

    let stats = cursor.poll().await?.expect("still running");
    assert_eq!(stats.state, "RUNNING");
    let stats = cursor.poll().await?.expect("last page");
    assert_eq!(stats.state, "FINISHED");
    assert_eq!(cursor.poll().await?, None);

    // rows buffered while polling are still there
    assert_eq!(cursor.fetchall().await?, vec![vec![RowValues::Int(1)]]);
    Ok(())
}

#[tokio::test]
async fn executemany_drains_all_but_the_last_run() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(queued_page(PAGE_1, &[]));
    let mut cursor = conn.cursor();
    cursor
        .executemany(
            "insert into t values (%s)",
            &[
                Params::positional(vec![RowValues::Int(1)]),
                Params::positional(vec![RowValues::Int(2)]),
            ],
        )
        .await?;

    assert_eq!(
        transport.statements(),
        vec!["insert into t values (1)", "insert into t values (2)"]
    );
    // the first insert was queued and had to be drained through PAGE_1
    assert_eq!(transport.requests().len(), 3);
    Ok(())
}

#[tokio::test]
async fn fetch_result_set_collects_named_rows() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let conn = TxnConnection::with_transport(test_options(), transport.clone());

    transport.push(rows_page(
        &[("id", "integer"), ("tags", "array(varchar)")],
        &json!([[1, ["x", "y"]]]),
        None,
    ));

    let mut cursor = conn.cursor();
    cursor.execute("select id, tags from t", None).await?;
    let rs = cursor.fetch_result_set().await?;

    assert_eq!(rs.len(), 1);
    assert_eq!(rs.results[0].get("id"), Some(&RowValues::Int(1)));
    assert_eq!(
        rs.results[0].get("tags"),
        Some(&RowValues::JSON(json!(["x", "y"])))
    );
    Ok(())
}
