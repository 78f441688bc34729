//! # Report Repository
//!
//! Read-only views that join partitions.
//!
//! ## How a Joined Read Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open dedicated connection on lendings.db                               │
//! │    ATTACH 'workers.db'     AS workers_db                                │
//! │    ATTACH 'tools.db'       AS tools_db                                  │
//! │    ATTACH 'consumables.db' AS consumables_db                            │
//! │    SELECT ... FROM lendings l LEFT JOIN workers_db.workers w ...        │
//! │  close connection (ATTACHes go with it)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! LEFT JOINs keep rows whose worker or item has been moved to the trash;
//! the name or description is then `None`.

use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::error::DbResult;
use crate::pool::{Database, Partition};
use toolcrib_core::{LendingView, ToolLoanCount};

const LENDING_VIEW_SELECT: &str = r#"
    SELECT
        l.id,
        l.worker_barcode,
        w.name || ' ' || w.lastname AS worker_name,
        l.item_barcode,
        l.item_type,
        COALESCE(t.description, c.description) AS item_description,
        l.checkout_time,
        l.return_time,
        l.amount,
        l.old_stock,
        l.new_stock
    FROM lendings l
    LEFT JOIN workers_db.workers w
        ON w.barcode = l.worker_barcode
    LEFT JOIN tools_db.tools t
        ON l.item_type = 'tool' AND t.barcode = l.item_barcode
    LEFT JOIN consumables_db.consumables c
        ON l.item_type = 'consumable' AND c.barcode = l.item_barcode
    WHERE 1 = 1
"#;

/// Which lending rows a view selects.
#[derive(Debug, Clone, Copy)]
pub enum LendingScope<'a> {
    /// Every row.
    All,
    /// Open tool loans.
    ActiveLoans,
    /// Open tool loans of one worker.
    ActiveLoansOf(&'a str),
    /// Every row for one item.
    Item(&'a str),
    /// Every row for one worker.
    Worker(&'a str),
    /// Consumptions by one worker.
    ConsumptionsOf(&'a str),
}

/// Repository for joined read-only views.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: Database,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(db: Database) -> Self {
        ReportRepository { db }
    }

    /// Lending rows in `scope`, newest checkout first.
    pub async fn lendings(
        &self,
        scope: LendingScope<'_>,
        limit: Option<i64>,
    ) -> DbResult<Vec<LendingView>> {
        debug!(?scope, ?limit, "Loading lending view");

        let mut qb = QueryBuilder::<Sqlite>::new(LENDING_VIEW_SELECT);
        match scope {
            LendingScope::All => {}
            LendingScope::ActiveLoans => {
                qb.push(" AND l.item_type = 'tool' AND l.return_time IS NULL");
            }
            LendingScope::ActiveLoansOf(worker) => {
                qb.push(" AND l.item_type = 'tool' AND l.return_time IS NULL AND l.worker_barcode = ")
                    .push_bind(worker.to_string());
            }
            LendingScope::Item(item) => {
                qb.push(" AND l.item_barcode = ").push_bind(item.to_string());
            }
            LendingScope::Worker(worker) => {
                qb.push(" AND l.worker_barcode = ").push_bind(worker.to_string());
            }
            LendingScope::ConsumptionsOf(worker) => {
                qb.push(" AND l.item_type = 'consumable' AND l.worker_barcode = ")
                    .push_bind(worker.to_string());
            }
        }
        qb.push(" ORDER BY l.checkout_time DESC, l.id");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let mut joined = self
            .db
            .open_joined(
                Partition::Lendings,
                &[Partition::Workers, Partition::Tools, Partition::Consumables],
            )
            .await?;
        let rows = qb
            .build_query_as::<LendingView>()
            .fetch_all(joined.conn())
            .await;

        joined.finish(rows).await
    }

    /// Open-loan count per tool, for every tool plus every loaned barcode
    /// that has no tool row.
    pub async fn tool_loan_counts(&self) -> DbResult<Vec<ToolLoanCount>> {
        let mut joined = self
            .db
            .open_joined(Partition::Tools, &[Partition::Lendings])
            .await?;

        let rows = sqlx::query_as::<_, ToolLoanCount>(
            r#"
            SELECT
                t.barcode AS tool_barcode,
                t.status AS tool_status,
                COUNT(l.id) AS open_loans
            FROM tools t
            LEFT JOIN lendings_db.lendings l
                ON l.item_barcode = t.barcode
               AND l.item_type = 'tool'
               AND l.return_time IS NULL
            GROUP BY t.barcode, t.status

            UNION ALL

            SELECT
                l.item_barcode AS tool_barcode,
                NULL AS tool_status,
                COUNT(*) AS open_loans
            FROM lendings_db.lendings l
            WHERE l.item_type = 'tool'
              AND l.return_time IS NULL
              AND NOT EXISTS (SELECT 1 FROM tools t WHERE t.barcode = l.item_barcode)
            GROUP BY l.item_barcode

            ORDER BY tool_barcode
            "#,
        )
        .fetch_all(joined.conn())
        .await;

        joined.finish(rows).await
    }
}
