use presto_txn::driver::headers::PRESTO_TRANSACTION_ID;
use presto_txn::prelude::*;
use presto_txn::test_utils::{
    ScriptedTransport, cleared_transaction, rows_page, started_transaction,
};
use serde_json::json;

#[tokio::test]
async fn txn_dialect_begin_opens_a_server_transaction() -> Result<(), PrestoTxnError> {
    register_txn_dialect();
    let transport = ScriptedTransport::new();
    let engine = create_engine("prestotxn://tester@localhost:32767/memory?poll_interval=0")?
        .with_transport(transport.clone());
    assert_eq!(engine.dialect().name(), "prestotxn");
    assert_eq!(engine.options().catalog, "memory");

    transport.push(started_transaction("T1"));
    let tx = engine.begin().await?;
    assert!(tx.connection().raw().transaction().is_active());

    tx.execute("drop table if exists b", None).await?;
    tx.execute("create table b (id integer)", None).await?;
    let insert = Params::positional(vec![RowValues::Int(1)]);
    tx.execute("insert into b values (%s)", Some(&insert)).await?;

    let request = transport.last_statement_request().expect("insert sent");
    assert_eq!(request.header(PRESTO_TRANSACTION_ID), Some("T1"));

    transport.push(cleared_transaction());
    let conn = tx.rollback().await?;
    assert!(!conn.raw().transaction().is_active());

    assert_eq!(
        transport.statements(),
        vec![
            "start transaction",
            "drop table if exists b",
            "create table b (id integer)",
            "insert into b values (1)",
            "rollback",
        ]
    );
    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn stock_dialect_begin_sends_nothing() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let engine = create_engine("presto://tester@localhost:32767/memory?poll_interval=0")?
        .with_transport(transport.clone());

    let tx = engine.begin().await?;
    assert!(!tx.connection().raw().transaction().is_active());
    let conn = tx.commit().await?;
    conn.close().await?;

    assert!(transport.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn engine_execute_returns_a_result_set() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let engine = create_engine("presto://tester@localhost:32767/memory/default?poll_interval=0")?
        .with_transport(transport.clone());

    transport.push(rows_page(
        &[("id", "integer")],
        &json!([[1], [2], [3], [4]]),
        None,
    ));
    let rs = engine.execute("select * from b", None).await?;

    assert_eq!(rs.len(), 4);
    let ids: Vec<i64> = rs
        .results
        .iter()
        .filter_map(|row| row.get("id").and_then(RowValues::as_int).copied())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn unknown_scheme_is_a_config_error() {
    let err = create_engine("mysql://tester@localhost/db").unwrap_err();
    assert!(matches!(err, PrestoTxnError::ConfigError(msg) if msg.contains("mysql")));
}

#[tokio::test]
async fn reflection_queries_go_through_the_connection() -> Result<(), PrestoTxnError> {
    let transport = ScriptedTransport::new();
    let engine = create_engine("presto://tester@localhost:32767/memory?poll_interval=0")?
        .with_transport(transport.clone());
    let conn = engine.connect()?;

    transport.push(rows_page(
        &[("Schema", "varchar")],
        &json!([["default"], ["information_schema"]]),
        None,
    ));
    let schemas = engine.dialect().get_schema_names(conn.raw()).await?;
    assert_eq!(schemas, vec!["default", "information_schema"]);

    transport.push(rows_page(&[("Table", "varchar")], &json!([["b"]]), None));
    assert!(
        engine
            .dialect()
            .has_table(conn.raw(), "B", Some("default"))
            .await?
    );

    assert_eq!(
        transport.statements(),
        vec!["SHOW SCHEMAS", "SHOW TABLES FROM \"default\""]
    );
    Ok(())
}
