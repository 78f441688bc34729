//! Joined lending views with names resolved from other partitions.

mod common;

use common::{add_consumable, add_tool, add_worker, admin, clerk, setup};
use toolcrib_core::{EntityKind, ItemType};
use toolcrib_ledger::{Ledger, LedgerSettings};

#[tokio::test]
async fn test_active_loans_resolve_names() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_worker(&t, "W-2").await;
    add_tool(&t, "T-1").await;
    add_tool(&t, "T-2").await;

    let engine = t.lending();
    engine.checkout("T-1", "W-1", &clerk()).await.unwrap();
    engine.checkout("T-2", "W-2", &clerk()).await.unwrap();
    engine.return_tool("T-1", &clerk()).await.unwrap();

    let active = t.reports().active_loans().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].item_barcode, "T-2");
    assert_eq!(active[0].worker_name.as_deref(), Some("Anna Tester W-2"));
    assert_eq!(active[0].item_description.as_deref(), Some("Cordless drill T-2"));
    assert!(active[0].return_time.is_none());

    assert!(t.reports().active_loans_for_worker("W-1").await.unwrap().is_empty());
    assert_eq!(t.reports().active_loans_for_worker("W-2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_worker_history_mixes_loans_and_consumptions() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    add_consumable(&t, "C-1", 10, 2).await;

    let engine = t.lending();
    engine.checkout("T-1", "W-1", &clerk()).await.unwrap();
    engine.consume("C-1", 4, "W-1", &clerk()).await.unwrap();

    let history = t.reports().worker_history("W-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].item_type, ItemType::Consumable);
    assert_eq!(history[0].item_description.as_deref(), Some("Work gloves C-1"));
    assert_eq!(history[0].old_stock, Some(10));
    assert_eq!(history[0].new_stock, Some(6));
    assert_eq!(history[1].item_type, ItemType::Tool);

    let item = t.reports().item_history("C-1").await.unwrap();
    assert_eq!(item.len(), 1);
    assert_eq!(item[0].amount, 4);
}

#[tokio::test]
async fn test_history_survives_trashed_worker() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_consumable(&t, "C-1", 10, 2).await;
    t.lending().consume("C-1", 1, "W-1", &clerk()).await.unwrap();

    t.trash()
        .soft_delete(EntityKind::Worker, "W-1", &admin())
        .await
        .unwrap();

    let history = t.reports().item_history("C-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].worker_barcode, "W-1");
    assert!(history[0].worker_name.is_none());
}

#[tokio::test]
async fn test_recent_views_are_limited() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_worker(&t, "W-2").await;
    add_consumable(&t, "C-1", 100, 2).await;

    let engine = t.lending();
    for amount in 1..=4 {
        engine.consume("C-1", amount, "W-1", &clerk()).await.unwrap();
    }
    engine.consume("C-1", 9, "W-2", &clerk()).await.unwrap();

    let ledger = Ledger::new(
        t.database().clone(),
        LedgerSettings {
            recent_consumptions_limit: 2,
            recent_activity_limit: 3,
            ..LedgerSettings::default()
        },
    );

    let recent = ledger.reports().recent_consumptions("W-1").await.unwrap();
    let amounts: Vec<i64> = recent.iter().map(|v| v.amount).collect();
    assert_eq!(amounts, vec![4, 3]);

    let activity = ledger.reports().recent_activity().await.unwrap();
    let amounts: Vec<i64> = activity.iter().map(|v| v.amount).collect();
    assert_eq!(amounts, vec![9, 4, 3]);
}
