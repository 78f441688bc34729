//! # Catalog
//!
//! Create, edit and look up workers, tools and consumables.
//!
//! ## Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  edit_tool("T-1", update)                                               │
//! │       │                                                                 │
//! │       ├── validate + normalize input      (no partition touched)        │
//! │       ├── read current row                ── missing ──► NotFound       │
//! │       ├── diff current vs. update         ── empty ──► current row      │
//! │       └── UPDATE + history row            (one tools.db transaction)    │
//! │               changed_fields = {"location": "Metal shop"}               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Barcodes are identities: they are validated on create and never change.
//! A barcode still held by a trash snapshot counts as taken: its history rows
//! belong to the trashed record.

use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use toolcrib_core::validation::{
    validate_barcode, validate_email, validate_optional_text, validate_required_text,
    validate_stock_level,
};
use toolcrib_core::{
    AdminCapability, ChangeRecord, Consumable, ConsumableFilter, ConsumableUpdate, CoreError,
    EntityKind, NewConsumable, NewTool, NewWorker, Tool, ToolFilter, ToolUpdate, Worker,
    WorkerUpdate, DEFAULT_LOCATION, DEFAULT_UNIT,
};
use toolcrib_db::{Database, DbError};

/// Catalog maintenance for the three entity families.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Workers
    // =========================================================================

    pub async fn create_worker(
        &self,
        worker: &NewWorker,
        admin: &AdminCapability,
    ) -> LedgerResult<Worker> {
        let clean = NewWorker {
            barcode: validate_barcode(&worker.barcode)?,
            name: validate_required_text("name", &worker.name)?,
            lastname: validate_required_text("lastname", &worker.lastname)?,
            department: validate_optional_text("department", worker.department.as_deref())?,
            email: validate_email(worker.email.as_deref())?,
        };
        self.ensure_unused(EntityKind::Worker, &clean.barcode).await?;

        let created = self
            .db
            .workers()
            .insert(&clean, admin.name())
            .await
            .map_err(|e| duplicate_or(e, EntityKind::Worker, &clean.barcode))?;

        info!(barcode = %created.barcode, by = %admin.name(), "Worker created");
        Ok(created)
    }

    pub async fn edit_worker(
        &self,
        barcode: &str,
        update: &WorkerUpdate,
        admin: &AdminCapability,
    ) -> LedgerResult<Worker> {
        let clean = WorkerUpdate {
            name: validate_required_text("name", &update.name)?,
            lastname: validate_required_text("lastname", &update.lastname)?,
            department: validate_optional_text("department", update.department.as_deref())?,
            email: validate_email(update.email.as_deref())?,
        };

        let current = self.get_worker(barcode).await?;
        let changed = changed_fields(
            &json!({
                "name": current.name,
                "lastname": current.lastname,
                "department": current.department,
                "email": current.email,
            }),
            &json!({
                "name": clean.name,
                "lastname": clean.lastname,
                "department": clean.department,
                "email": clean.email,
            }),
        );
        if is_empty(&changed) {
            return Ok(current);
        }

        let updated = self
            .db
            .workers()
            .update(barcode, &clean, &changed, admin.name())
            .await?;

        info!(barcode = %barcode, changed = %changed, by = %admin.name(), "Worker updated");
        Ok(updated)
    }

    pub async fn get_worker(&self, barcode: &str) -> LedgerResult<Worker> {
        self.db
            .workers()
            .get(barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("worker", barcode).into())
    }

    pub async fn list_workers(&self) -> LedgerResult<Vec<Worker>> {
        Ok(self.db.workers().list().await?)
    }

    /// Create/update history of one worker, newest first.
    pub async fn worker_changes(&self, barcode: &str) -> LedgerResult<Vec<ChangeRecord>> {
        Ok(self.db.workers().history(barcode).await?)
    }

    // =========================================================================
    // Tools
    // =========================================================================

    /// Creates an `Available` tool. A missing location becomes
    /// [`DEFAULT_LOCATION`].
    pub async fn create_tool(&self, tool: &NewTool, admin: &AdminCapability) -> LedgerResult<Tool> {
        let clean = NewTool {
            barcode: validate_barcode(&tool.barcode)?,
            description: validate_required_text("description", &tool.description)?,
            location: validate_optional_text("location", tool.location.as_deref())?,
            category: validate_optional_text("category", tool.category.as_deref())?,
            image_ref: validate_optional_text("image_ref", tool.image_ref.as_deref())?,
        };
        let location = clean.location.as_deref().unwrap_or(DEFAULT_LOCATION);
        self.ensure_unused(EntityKind::Tool, &clean.barcode).await?;

        let created = self
            .db
            .tools()
            .insert(&clean, location, admin.name())
            .await
            .map_err(|e| duplicate_or(e, EntityKind::Tool, &clean.barcode))?;

        info!(barcode = %created.barcode, by = %admin.name(), "Tool created");
        Ok(created)
    }

    /// Edits catalog fields. Status only changes through the state machine.
    pub async fn edit_tool(
        &self,
        barcode: &str,
        update: &ToolUpdate,
        admin: &AdminCapability,
    ) -> LedgerResult<Tool> {
        let clean = ToolUpdate {
            description: validate_required_text("description", &update.description)?,
            location: validate_required_text("location", &update.location)?,
            category: validate_optional_text("category", update.category.as_deref())?,
            image_ref: validate_optional_text("image_ref", update.image_ref.as_deref())?,
        };

        let current = self.get_tool(barcode).await?;

        let mut before = json!({
            "description": current.description,
            "location": current.location,
            "category": current.category,
        });
        let mut after = json!({
            "description": clean.description,
            "location": clean.location,
            "category": clean.category,
        });
        // No new picture keeps the old one
        if let Some(image_ref) = &clean.image_ref {
            before["image_ref"] = json!(current.image_ref);
            after["image_ref"] = json!(image_ref);
        }

        let changed = changed_fields(&before, &after);
        if is_empty(&changed) {
            return Ok(current);
        }

        let updated = self
            .db
            .tools()
            .update(barcode, &clean, &changed, admin.name())
            .await?;

        info!(barcode = %barcode, changed = %changed, by = %admin.name(), "Tool updated");
        Ok(updated)
    }

    pub async fn get_tool(&self, barcode: &str) -> LedgerResult<Tool> {
        self.db
            .tools()
            .get(barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("tool", barcode).into())
    }

    pub async fn list_tools(&self, filter: &ToolFilter) -> LedgerResult<Vec<Tool>> {
        Ok(self.db.tools().list(filter).await?)
    }

    /// Distinct tool locations, for filter widgets.
    pub async fn tool_locations(&self) -> LedgerResult<Vec<String>> {
        Ok(self.db.tools().locations().await?)
    }

    /// Distinct tool categories, for filter widgets.
    pub async fn tool_categories(&self) -> LedgerResult<Vec<String>> {
        Ok(self.db.tools().categories().await?)
    }

    /// Create/update history of one tool, newest first.
    pub async fn tool_changes(&self, barcode: &str) -> LedgerResult<Vec<ChangeRecord>> {
        Ok(self.db.tools().history(barcode).await?)
    }

    // =========================================================================
    // Consumables
    // =========================================================================

    /// Creates a consumable with its initial stock.
    ///
    /// The initial stock is not a stock movement, so the stock history starts
    /// empty.
    pub async fn create_consumable(
        &self,
        consumable: &NewConsumable,
        admin: &AdminCapability,
    ) -> LedgerResult<Consumable> {
        validate_stock_level("minimum_stock", consumable.minimum_stock)?;
        validate_stock_level("initial_stock", consumable.initial_stock)?;

        let clean = NewConsumable {
            barcode: validate_barcode(&consumable.barcode)?,
            description: validate_required_text("description", &consumable.description)?,
            location: validate_optional_text("location", consumable.location.as_deref())?,
            category: validate_optional_text("category", consumable.category.as_deref())?,
            unit: validate_optional_text("unit", consumable.unit.as_deref())?,
            minimum_stock: consumable.minimum_stock,
            initial_stock: consumable.initial_stock,
        };
        let location = clean.location.as_deref().unwrap_or(DEFAULT_LOCATION);
        let unit = clean.unit.as_deref().unwrap_or(DEFAULT_UNIT);
        self.ensure_unused(EntityKind::Consumable, &clean.barcode).await?;

        let created = self
            .db
            .consumables()
            .insert(&clean, location, unit)
            .await
            .map_err(|e| duplicate_or(e, EntityKind::Consumable, &clean.barcode))?;

        info!(
            barcode = %created.barcode,
            stock = created.current_stock,
            by = %admin.name(),
            "Consumable created"
        );
        Ok(created)
    }

    /// Edits catalog fields and the minimum stock. The stock level itself only
    /// moves through the stock ledger.
    pub async fn edit_consumable(
        &self,
        barcode: &str,
        update: &ConsumableUpdate,
        admin: &AdminCapability,
    ) -> LedgerResult<Consumable> {
        validate_stock_level("minimum_stock", update.minimum_stock)?;
        let clean = ConsumableUpdate {
            description: validate_required_text("description", &update.description)?,
            location: validate_required_text("location", &update.location)?,
            category: validate_optional_text("category", update.category.as_deref())?,
            unit: validate_required_text("unit", &update.unit)?,
            minimum_stock: update.minimum_stock,
        };

        let updated = self.db.consumables().update(barcode, &clean).await?;

        info!(barcode = %barcode, by = %admin.name(), "Consumable updated");
        Ok(updated)
    }

    pub async fn get_consumable(&self, barcode: &str) -> LedgerResult<Consumable> {
        self.db
            .consumables()
            .get(barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("consumable", barcode).into())
    }

    /// Lists consumables. The status filter applies to the derived status.
    pub async fn list_consumables(&self, filter: &ConsumableFilter) -> LedgerResult<Vec<Consumable>> {
        let rows = self
            .db
            .consumables()
            .list(filter.location.as_deref(), filter.category.as_deref())
            .await?;

        Ok(match filter.status {
            Some(status) => rows.into_iter().filter(|c| c.status() == status).collect(),
            None => rows,
        })
    }

    /// Rejects a barcode that sits in the trash. The live table's primary key
    /// covers the other case.
    async fn ensure_unused(&self, kind: EntityKind, barcode: &str) -> LedgerResult<()> {
        if self.db.trash().holds_barcode(kind, barcode).await? {
            return Err(CoreError::Duplicate {
                kind,
                barcode: barcode.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Maps a unique violation on create to `Duplicate`.
fn duplicate_or(err: DbError, kind: EntityKind, barcode: &str) -> LedgerError {
    if err.is_unique_violation() {
        CoreError::Duplicate {
            kind,
            barcode: barcode.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

/// Fields of `after` whose value differs from `before`, with their new value.
fn changed_fields(before: &Value, after: &Value) -> Value {
    let mut changed = Map::new();
    if let Value::Object(fields) = after {
        for (key, value) in fields {
            if before.get(key) != Some(value) {
                changed.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(changed)
}

fn is_empty(fields: &Value) -> bool {
    fields.as_object().map_or(true, Map::is_empty)
}
