//! Checkout and return of tools across the tools and lendings partitions.

mod common;

use common::{add_tool, add_worker, admin, clerk, domain, setup};
use toolcrib_core::{CoreError, LoanMismatchKind, ToolStatus};

#[tokio::test]
async fn test_checkout_then_return() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    let loan = t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();
    assert_eq!(loan.worker_barcode, "W-1");
    assert_eq!(loan.amount, 1);
    assert!(loan.is_open_loan());

    assert_eq!(t.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Borrowed);
    assert_eq!(t.database().lendings().count_open_for_tool("T-1").await.unwrap(), 1);

    let returned = t.lending().return_tool("T-1", &clerk()).await.unwrap();
    assert_eq!(returned.id, loan.id);
    assert!(returned.return_time.is_some());

    assert_eq!(t.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Available);
    assert_eq!(t.database().lendings().count_open_for_tool("T-1").await.unwrap(), 0);
    let stored = t.database().lendings().get(&loan.id).await.unwrap().unwrap();
    assert!(stored.return_time.is_some());
}

#[tokio::test]
async fn test_second_checkout_is_not_available() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_worker(&t, "W-2").await;
    add_tool(&t, "T-1").await;

    t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();

    let err = domain(t.lending().checkout("T-1", "W-2", &clerk()).await.unwrap_err());
    assert!(matches!(
        err,
        CoreError::NotAvailable { status: ToolStatus::Borrowed, .. }
    ));

    // Nothing changed
    assert_eq!(t.catalog().get_tool("T-1").await.unwrap().status, ToolStatus::Borrowed);
    let history = t.reports().item_history("T-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].worker_barcode, "W-1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_checkouts_exactly_one_wins() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_worker(&t, "W-2").await;
    add_tool(&t, "T-1").await;

    let first = t.lending();
    let second = t.lending();
    let actor = clerk();

    let (a, b) = tokio::join!(
        first.checkout("T-1", "W-1", &actor),
        second.checkout("T-1", "W-2", &actor),
    );

    let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        domain(loser.unwrap_err()),
        CoreError::NotAvailable { .. }
    ));

    assert_eq!(t.database().lendings().count_open_for_tool("T-1").await.unwrap(), 1);
    assert!(t.lending().reconcile().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_checkouts_over_separate_pools() {
    let t = setup().await;
    add_tool(&t, "T-1").await;
    for w in 0..10 {
        add_worker(&t, &format!("W-{w}")).await;
    }

    let ledgers = [t.reopen().await, t.reopen().await];
    let handles: Vec<_> = (0..10)
        .map(|w| {
            let ledger = ledgers[w % ledgers.len()].clone();
            tokio::spawn(async move {
                ledger
                    .lending()
                    .checkout("T-1", &format!("W-{w}"), &clerk())
                    .await
            })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert!(matches!(domain(e), CoreError::NotAvailable { .. })),
        }
    }
    assert_eq!(wins, 1);

    assert_eq!(t.database().lendings().count_open_for_tool("T-1").await.unwrap(), 1);
    assert!(t.lending().reconcile().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_unknown_worker_or_tool() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    let err = domain(t.lending().checkout("T-1", "W-404", &clerk()).await.unwrap_err());
    assert!(matches!(err, CoreError::NotFound { entity: "worker", .. }));

    let err = domain(t.lending().checkout("T-404", "W-1", &clerk()).await.unwrap_err());
    assert!(matches!(err, CoreError::NotFound { entity: "tool", .. }));

    assert_eq!(t.database().lendings().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_defective_tool_cannot_be_checked_out() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    t.tools()
        .transition("T-1", ToolStatus::Defective, Some("cracked housing"), &admin())
        .await
        .unwrap();

    let err = domain(t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap_err());
    assert!(matches!(
        err,
        CoreError::NotAvailable { status: ToolStatus::Defective, .. }
    ));
}

#[tokio::test]
async fn test_return_without_loan() {
    let t = setup().await;
    add_tool(&t, "T-1").await;

    let err = domain(t.lending().return_tool("T-1", &clerk()).await.unwrap_err());
    assert!(matches!(err, CoreError::NoActiveLending { .. }));
}

#[tokio::test]
async fn test_tool_broken_while_lent_stays_defective_on_return() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    t.lending().checkout("T-1", "W-1", &clerk()).await.unwrap();
    t.tools()
        .transition("T-1", ToolStatus::Defective, Some("reported broken"), &admin())
        .await
        .unwrap();

    t.lending().return_tool("T-1", &clerk()).await.unwrap();

    let tool = t.catalog().get_tool("T-1").await.unwrap();
    assert_eq!(tool.status, ToolStatus::Defective);
    assert!(tool.defect_timestamp.is_some());
    assert_eq!(t.database().lendings().count_open_for_tool("T-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_borrowed_iff_one_open_loan_over_a_sequence() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_worker(&t, "W-2").await;
    for barcode in ["T-1", "T-2", "T-3"] {
        add_tool(&t, barcode).await;
    }

    let engine = t.lending();
    engine.checkout("T-1", "W-1", &clerk()).await.unwrap();
    engine.checkout("T-2", "W-2", &clerk()).await.unwrap();
    engine.return_tool("T-1", &clerk()).await.unwrap();
    engine.checkout("T-1", "W-2", &clerk()).await.unwrap();
    let _ = engine.checkout("T-2", "W-1", &clerk()).await.unwrap_err();
    engine.return_tool("T-2", &clerk()).await.unwrap();
    let _ = engine.return_tool("T-3", &clerk()).await.unwrap_err();

    for barcode in ["T-1", "T-2", "T-3"] {
        let status = t.catalog().get_tool(barcode).await.unwrap().status;
        let open = t.database().lendings().count_open_for_tool(barcode).await.unwrap();
        assert_eq!(status == ToolStatus::Borrowed, open == 1, "{barcode}");
    }
    assert!(engine.reconcile().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconcile_reports_manual_overrides() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;
    add_tool(&t, "T-2").await;

    // Borrowed by hand, no loan behind it
    t.tools()
        .transition("T-1", ToolStatus::Borrowed, None, &admin())
        .await
        .unwrap();

    // Lent, then forced back to Available with the loan still open
    t.lending().checkout("T-2", "W-1", &clerk()).await.unwrap();
    t.tools()
        .transition("T-2", ToolStatus::Available, Some("found on shelf"), &admin())
        .await
        .unwrap();

    let mismatches = t.lending().reconcile().await.unwrap();
    assert_eq!(mismatches.len(), 2);
    assert_eq!(mismatches[0].tool_barcode, "T-1");
    assert_eq!(mismatches[0].kind, LoanMismatchKind::BorrowedWithoutLoan);
    assert_eq!(mismatches[1].tool_barcode, "T-2");
    assert_eq!(mismatches[1].kind, LoanMismatchKind::LoanButNotBorrowed);
}

#[tokio::test]
async fn test_worker_role_may_lend() {
    let t = setup().await;
    add_worker(&t, "W-1").await;
    add_tool(&t, "T-1").await;

    let worker = toolcrib_core::Actor::worker("W-1");
    let loan = t.lending().checkout("T-1", "W-1", &worker).await.unwrap();
    assert!(loan.is_open_loan());

    let history = t.tools().status_history("T-1").await.unwrap();
    assert_eq!(history[0].changed_by, "W-1");
    assert_eq!(history[0].new_status, ToolStatus::Borrowed);
}
