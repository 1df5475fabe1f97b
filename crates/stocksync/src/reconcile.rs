//! Reconciler
//!
//! Compares supplier stock against the platform export under the shared key
//! space and decides which rows go into the import file:
//!
//! 1. **Change pass**: every key present in both mappings whose quantity or
//!    availability differs yields a change record (supplier values) plus an
//!    audit entry. Any SKU examined here counts as covered, changed or not.
//! 2. **Retention pass**: every universe SKU never examined yields a record
//!    re-asserting the platform's own values, so the import stays
//!    authoritative over the whole catalog.
//!
//! Changes precede retentions; a SKU is never emitted by both passes.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::inventory::InventoryExport;
use crate::model::{AuditEntry, ChangeOrigin, ChangeRecord, SupplierStockMap};

/// Output of one reconciliation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    pub changes: Vec<ChangeRecord>,
    /// One entry per change-pass record, same order
    pub audit: Vec<AuditEntry>,
    /// Keys present in both mappings
    pub matched: usize,
    pub changed: usize,
    pub retained: usize,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compute the update set. Pure and total over its inputs.
pub fn reconcile(supplier: &SupplierStockMap, export: &InventoryExport) -> Reconciliation {
    info!("Comparing data and detecting changes...");
    let mut result = Reconciliation::default();
    let mut covered: HashSet<&str> = HashSet::with_capacity(export.universe.len());

    for (key, record) in &export.records {
        let Some(stock) = supplier.get(key) else {
            continue;
        };
        result.matched += 1;
        if let Some(sku) = record.sku.as_deref() {
            covered.insert(sku);
        }

        let new_status = stock.availability();
        if record.current_quantity == stock.quantity && record.current_availability == new_status
        {
            continue;
        }

        debug!(
            %key,
            old_stock = record.current_quantity,
            new_stock = stock.quantity,
            "Stock change detected"
        );
        let change = ChangeRecord {
            sku: record.sku.clone(),
            ean: record.ean.clone(),
            manage_stock: true,
            stock_status: new_status.clone(),
            stock: stock.quantity,
            record_id: record.record_id.clone(),
            backorders: false,
            origin: ChangeOrigin::Changed,
        };
        result.audit.push(AuditEntry {
            identifier: change.identifier().to_string(),
            record_id: record.record_id.clone(),
            old_quantity: record.current_quantity,
            new_quantity: stock.quantity,
            old_status: record.current_availability.clone(),
            new_status,
        });
        result.changes.push(change);
        result.changed += 1;
    }

    for (sku, snapshot) in export.universe.iter() {
        if covered.contains(sku) {
            continue;
        }
        result.changes.push(ChangeRecord {
            sku: Some(sku.to_string()),
            ean: snapshot.ean.clone(),
            manage_stock: true,
            stock_status: snapshot.current_availability.clone(),
            stock: snapshot.current_quantity,
            record_id: snapshot.record_id.clone(),
            backorders: false,
            origin: ChangeOrigin::Retained,
        });
        result.retained += 1;
    }

    info!(
        matched = result.matched,
        changed = result.changed,
        retained = result.retained,
        "Found {} changes",
        result.changes.len()
    );
    result
}
