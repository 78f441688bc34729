//! Shared setup for the ledger integration tests: a fresh set of partition
//! files in a temporary directory per test.

#![allow(dead_code)]

use tempfile::TempDir;
use toolcrib_core::{
    Actor, AdminCapability, Consumable, CoreError, NewConsumable, NewTool, NewWorker, Tool,
    Worker,
};
use toolcrib_db::{Database, DbConfig};
use toolcrib_ledger::{Ledger, LedgerError, LedgerSettings};

/// Keeps the directory alive as long as the ledger.
pub struct TestLedger {
    pub ledger: Ledger,
    _dir: TempDir,
}

impl std::ops::Deref for TestLedger {
    type Target = Ledger;

    fn deref(&self) -> &Ledger {
        &self.ledger
    }
}

impl TestLedger {
    /// A second ledger over the same files, with pools of its own.
    pub async fn reopen(&self) -> Ledger {
        let db = Database::new(DbConfig::new(self._dir.path()))
            .await
            .expect("reopen partitions");
        Ledger::new(db, LedgerSettings::default())
    }
}

pub async fn setup() -> TestLedger {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Database::new(DbConfig::new(dir.path()))
        .await
        .expect("open partitions");

    TestLedger {
        ledger: Ledger::new(db, LedgerSettings::default()),
        _dir: dir,
    }
}

pub fn admin() -> AdminCapability {
    Actor::admin("admin").require_admin().expect("admin role")
}

pub fn clerk() -> Actor {
    Actor::worker("front-desk")
}

pub async fn add_worker(ledger: &Ledger, barcode: &str) -> Worker {
    ledger
        .catalog()
        .create_worker(
            &NewWorker {
                barcode: barcode.to_string(),
                name: "Anna".to_string(),
                lastname: format!("Tester {}", barcode),
                department: Some("Engineering".to_string()),
                email: None,
            },
            &admin(),
        )
        .await
        .expect("create worker")
}

pub async fn add_tool(ledger: &Ledger, barcode: &str) -> Tool {
    ledger
        .catalog()
        .create_tool(
            &NewTool {
                barcode: barcode.to_string(),
                description: format!("Cordless drill {}", barcode),
                location: Some("Wood shop".to_string()),
                category: Some("Power tools".to_string()),
                image_ref: None,
            },
            &admin(),
        )
        .await
        .expect("create tool")
}

pub async fn add_consumable(ledger: &Ledger, barcode: &str, stock: i64, minimum: i64) -> Consumable {
    ledger
        .catalog()
        .create_consumable(
            &NewConsumable {
                barcode: barcode.to_string(),
                description: format!("Work gloves {}", barcode),
                location: None,
                category: Some("PPE".to_string()),
                unit: Some("pair".to_string()),
                minimum_stock: minimum,
                initial_stock: stock,
            },
            &admin(),
        )
        .await
        .expect("create consumable")
}

/// Unwraps the domain error of a failed call.
pub fn domain(err: LedgerError) -> CoreError {
    match err {
        LedgerError::Domain(e) => e,
        other => panic!("expected a domain error, got {other:?}"),
    }
}
