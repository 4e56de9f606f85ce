//! Runs a rolled-back transaction against a local coordinator.
//!
//! ```text
//! cargo run --example transaction_roundtrip -- prestotxn://localhost:32767/memory
//! ```

use presto_txn::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "prestotxn://localhost:32767/memory".to_string());

    register_txn_dialect();
    let engine = create_engine(&url)?;

    engine.execute("drop table if exists b", None).await?;

    let tx = engine.begin().await?;
    tx.execute("create table b (id integer)", None).await?;
    for id in 1..=4 {
        let params = Params::positional(vec![RowValues::Int(id)]);
        tx.execute("insert into b values (%s)", Some(&params)).await?;
    }
    tx.rollback().await?.close().await?;

    let tx = engine.begin().await?;
    match tx.execute("select * from b", None).await {
        Ok(rs) => println!("after rollback: {} rows", rs.len()),
        Err(err) => println!("after rollback: {err}"),
    }
    tx.commit().await?.close().await?;
    Ok(())
}
