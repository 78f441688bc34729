//! Soft delete, restore and purge across the live partitions and trash.db.

mod common;

use common::{add_consumable, add_tool, add_worker, admin, clerk, domain, setup};
use toolcrib_core::{Actor, CoreError, EntityKind, NewTool, ToolStatus, TrashedRecord};
use toolcrib_ledger::{ErrorCode, LedgerError};

#[tokio::test]
async fn test_worker_with_open_loan_cannot_be_deleted() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();

    let err = domain(
        t.trash()
            .soft_delete(EntityKind::Worker, "W-1", &admin())
            .await
            .unwrap_err(),
    );
    assert!(matches!(
        err,
        CoreError::HasActiveLendings { kind: EntityKind::Worker, count: 1, .. }
    ));
    assert!(t.trash().list(EntityKind::Worker).await.unwrap().is_empty());

    t.lending().return_tool("T-1", &clerk()).await.unwrap();
    t.trash()
        .soft_delete(EntityKind::Worker, "W-1", &admin())
        .await
        .unwrap();
    assert!(t.database().workers().get("W-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_lent_tool_cannot_be_deleted() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();

    let err = t
        .trash()
        .soft_delete(EntityKind::Tool, "T-1", &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::HasActiveLendings);
    assert_eq!(t.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Borrowed);
}

#[tokio::test]
async fn test_worker_round_trip_through_trash() {
    let t = setup().await;
    add_worker(&t, "W-1").await;

    let trash_id = t
        .trash()
        .soft_delete(EntityKind::Worker, "W-1", &admin())
        .await
        .unwrap();

    let listed = t.trash().list(EntityKind::Worker).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), trash_id);
    match &listed[0] {
        TrashedRecord::Worker(w) => {
            assert_eq!(w.barcode, "W-1");
            assert_eq!(w.lastname, "Tester W-1");
            assert_eq!(w.deleted_by, "admin");
        }
        other => panic!("unexpected record: {other:?}"),
    }

    let restored = t
        .trash()
        .restore(EntityKind::Worker, &trash_id, &admin())
        .await
        .unwrap();
    assert_eq!(restored.kind, EntityKind::Worker);
    assert_eq!(restored.barcode, "W-1");

    let worker = t.catalog().get_worker("W-1").await.unwrap();
    assert_eq!(worker.department.as_deref(), Some("Engineering"));
    assert!(t.trash().list(EntityKind::Worker).await.unwrap().is_empty());
    assert!(t.trash().get(EntityKind::Worker, &trash_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_over_reused_barcode_conflicts() {
    let t = setup().await;
    add_tool(&t, "T-1").await;

    let trash_id = t
        .trash()
        .soft_delete(EntityKind::Tool, "T-1", &admin())
        .await
        .unwrap();
    // The catalog refuses trashed barcodes; a row written straight to the
    // store still takes it
    t.database()
        .tools()
        .insert(
            &NewTool {
                barcode: "T-1".to_string(),
                description: "Imported drill".to_string(),
                location: None,
                category: None,
                image_ref: None,
            },
            "import",
            "import",
        )
        .await
        .unwrap();

    let err = domain(
        t.trash()
            .restore(EntityKind::Tool, &trash_id, &admin())
            .await
            .unwrap_err(),
    );
    assert!(matches!(
        err,
        CoreError::BarcodeConflict { kind: EntityKind::Tool, ref barcode } if barcode == "T-1"
    ));

    // Snapshot stays for a later attempt
    assert!(t.trash().get(EntityKind::Tool, &trash_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_defective_tool_comes_back_available() {
    let t = setup().await;
    add_tool(&t, "T-1").await;
    t.tools()
        .transition("T-1", ToolStatus::Defective, Some("blade chipped"), &admin())
        .await
        .unwrap();

    let trash_id = t
        .trash()
        .soft_delete(EntityKind::Tool, "T-1", &admin())
        .await
        .unwrap();

    match t.trash().get(EntityKind::Tool, &trash_id).await.unwrap() {
        Some(TrashedRecord::Tool(snapshot)) => assert_eq!(snapshot.status, ToolStatus::Defective),
        other => panic!("unexpected record: {other:?}"),
    }

    t.trash()
        .restore(EntityKind::Tool, &trash_id, &admin())
        .await
        .unwrap();

    let tool = t.catalog().get_tool("T-1").await.unwrap();
    assert_eq!(tool.status, ToolStatus::Available);
    assert!(tool.defect_timestamp.is_none());
    assert_eq!(tool.location, "Wood shop");
}

#[tokio::test]
async fn test_consumable_comes_back_with_last_stock() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_consumable(&t, "C-1", 40, 10).await;
    t.lending().consume("C-1", 9, "W-1", &clerk()).await.unwrap();

    let trash_id = t
        .trash()
        .soft_delete(EntityKind::Consumable, "C-1", &admin())
        .await
        .unwrap();
    assert!(t.database().consumables().get("C-1").await.unwrap().is_none());

    t.trash()
        .restore(EntityKind::Consumable, &trash_id, &admin())
        .await
        .unwrap();

    let consumable = t.catalog().get_consumable("C-1").await.unwrap();
    assert_eq!(consumable.current_stock, 31);
    assert_eq!(consumable.minimum_stock, 10);
    assert_eq!(consumable.unit, "pair");
}

#[tokio::test]
async fn test_unknown_records() {
    let t = setup().await;

    let err = domain(
        t.trash()
            .soft_delete(EntityKind::Consumable, "C-404", &admin())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::NotFound { entity: "consumable", .. }));

    let err = domain(
        t.trash()
            .restore(EntityKind::Tool, "no-such-id", &admin())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::NotFound { entity: "trash record", .. }));

    let err = domain(
        t.trash()
            .permanently_delete(EntityKind::Worker, "no-such-id", &admin())
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_purge() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    add_tool(&t, "T-2").await;
    add_consumable(&t, "C-1", 1, 0).await;

    let trash = t.trash();
    let worker_id = trash.soft_delete(EntityKind::Worker, "W-1", &admin()).await.unwrap();
    trash.soft_delete(EntityKind::Tool, "T-1", &admin()).await.unwrap();
    trash.soft_delete(EntityKind::Tool, "T-2", &admin()).await.unwrap();
    trash.soft_delete(EntityKind::Consumable, "C-1", &admin()).await.unwrap();

    trash
        .permanently_delete(EntityKind::Worker, &worker_id, &admin())
        .await
        .unwrap();
    assert!(trash.list(EntityKind::Worker).await.unwrap().is_empty());

    assert_eq!(trash.empty_trash(&admin()).await.unwrap(), 3);
    for kind in EntityKind::ALL {
        assert!(trash.list(kind).await.unwrap().is_empty());
    }
}

#[test]
fn test_worker_role_gets_no_admin_capability() {
    let err: LedgerError = Actor::worker("W-1").require_admin().unwrap_err().into();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(err.report().message, "W-1 is not allowed to perform this operation");
}
