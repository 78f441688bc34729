//! Second saga step failing after the first committed.
//!
//! Failures are forced by closing one partition pool mid-way, or by a
//! trigger that refuses deletes where the pool has to stay open for the
//! first step. A second ledger over the same files then inspects what was
//! left behind.

mod common;

use common::{add_consumable, add_tool, add_worker, admin, clerk, setup, TestLedger};
use toolcrib_core::{EntityKind, StockAction, ToolStatus};
use toolcrib_db::Partition;
use toolcrib_ledger::ErrorCode;

/// Makes every DELETE on `table` in `partition` abort.
async fn refuse_deletes(t: &TestLedger, partition: Partition, table: &str) {
    let sql = format!(
        "CREATE TRIGGER refuse_{table}_delete BEFORE DELETE ON {table} \
         BEGIN SELECT RAISE(ABORT, '{table} is locked'); END"
    );
    sqlx::query(&sql)
        .execute(t.database().partition(partition))
        .await
        .expect("create trigger");
}

async fn allow_deletes(t: &TestLedger, partition: Partition, table: &str) {
    let sql = format!("DROP TRIGGER refuse_{table}_delete");
    sqlx::query(&sql)
        .execute(t.database().partition(partition))
        .await
        .expect("drop trigger");
}

#[tokio::test]
async fn test_checkout_compensated_when_lending_insert_fails() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    t.database().partition(Partition::Lendings).close().await;

    let err = t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PartialFailure);

    let failure = err.partial_failure().expect("partial failure report");
    assert_eq!(failure.operation, "checkout");
    assert_eq!(failure.barcode, "T-1");
    assert!(failure.compensated);
    assert_eq!(failure.before["tool"]["status"], "available");

    let fresh = t.reopen().await;
    assert_eq!(fresh.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Available);
    assert_eq!(fresh.database().lendings().count().await.unwrap(), 0);

    // Both the borrow and its undo are on record
    let history = fresh.tools().status_history("T-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].new_status, ToolStatus::Available);
    assert_eq!(history[0].comment.as_deref(), Some("checkout compensation"));
}

#[tokio::test]
async fn test_return_compensated_when_tool_update_fails() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    let loan = t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();

    t.database().partition(Partition::Tools).close().await;

    let err = t.lending().return_tool("T-1", &clerk()).await.unwrap_err();
    let report = err.report();
    assert_eq!(report.code, ErrorCode::PartialFailure);
    let failure = report.partial.expect("partial failure report");
    assert_eq!(failure.operation, "return");
    assert!(failure.compensated);

    let fresh = t.reopen().await;
    let stored = fresh.database().lendings().get(&loan.id).await.unwrap().unwrap();
    assert!(stored.return_time.is_none());
    assert_eq!(fresh.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Borrowed);
    assert!(fresh.lending().reconcile().await.unwrap().is_empty());

    // The saga can simply be retried
    fresh.lending().return_tool("T-1", &clerk()).await.unwrap();
    assert_eq!(fresh.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Available);
}

#[tokio::test]
async fn test_consume_compensated_when_lending_insert_fails() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_consumable(&t, "C-1", 12, 4).await;

    t.database().partition(Partition::Lendings).close().await;

    let err = t.lending().consume("C-1", 5, "W-1", &clerk()).await.unwrap_err();
    let failure = err.partial_failure().expect("partial failure report");
    assert_eq!(failure.operation, "consume");
    assert!(failure.compensated);
    assert_eq!(failure.before["current_stock"], 12);
    assert_eq!(failure.after["current_stock"], 7);

    let fresh = t.reopen().await;
    assert_eq!(fresh.catalog().get_consumable("C-1").await.unwrap().current_stock, 12);
    assert_eq!(fresh.database().consumables().recorded_delta("C-1").await.unwrap(), 0);

    let history = fresh.stock().stock_history("C-1").await.unwrap();
    let actions: Vec<StockAction> = history.iter().map(|m| m.action).collect();
    assert_eq!(actions, vec![StockAction::Compensation, StockAction::Consumption]);
    assert_eq!(fresh.database().lendings().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_soft_delete_compensated_when_live_delete_fails() {
    let t = setup().await;
    add_tool(&t, "T-1").await;
    refuse_deletes(&t, Partition::Tools, "tools").await;

    let err = t
        .trash()
        .soft_delete(EntityKind::Tool, "T-1", &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PartialFailure);

    let failure = err.partial_failure().expect("partial failure report");
    assert_eq!(failure.operation, "soft_delete");
    assert_eq!(failure.barcode, "T-1");
    assert!(failure.compensated);
    assert!(failure.cause.contains("tools is locked"));
    assert_eq!(failure.before["live"]["barcode"], "T-1");

    // Still live, and no orphan snapshot in trash
    let fresh = t.reopen().await;
    assert_eq!(fresh.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Available);
    assert!(fresh.trash().list(EntityKind::Tool).await.unwrap().is_empty());

    allow_deletes(&t, Partition::Tools, "tools").await;
    fresh
        .trash()
        .soft_delete(EntityKind::Tool, "T-1", &admin())
        .await
        .unwrap();
    assert!(fresh.database().tools().get("T-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_compensated_when_trash_delete_fails() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    let trash_id = t
        .trash()
        .soft_delete(EntityKind::Worker, "W-1", &admin())
        .await
        .unwrap();
    refuse_deletes(&t, Partition::Trash, "deleted_workers").await;

    let err = t
        .trash()
        .restore(EntityKind::Worker, &trash_id, &admin())
        .await
        .unwrap_err();
    let failure = err.partial_failure().expect("partial failure report");
    assert_eq!(failure.operation, "restore");
    assert_eq!(failure.barcode, "W-1");
    assert!(failure.compensated);
    assert_eq!(failure.before["trash"]["id"], trash_id.as_str());

    // The live copy is gone again; the snapshot waits for a retry
    let fresh = t.reopen().await;
    assert!(fresh.database().workers().get("W-1").await.unwrap().is_none());
    assert!(fresh.trash().get(EntityKind::Worker, &trash_id).await.unwrap().is_some());

    allow_deletes(&t, Partition::Trash, "deleted_workers").await;
    fresh
        .trash()
        .restore(EntityKind::Worker, &trash_id, &admin())
        .await
        .unwrap();
    assert_eq!(fresh.catalog().get_worker("W-1").await.unwrap().lastname, "Tester W-1");
    assert!(fresh.trash().list(EntityKind::Worker).await.unwrap().is_empty());
}
