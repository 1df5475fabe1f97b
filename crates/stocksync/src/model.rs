//! Core types for stock reconciliation
//!
//! Both sources (supplier feed, platform export) are normalized into one key
//! space: `sku:<SKU>` for parent/standalone products and `ean:<EAN>` for
//! variants. The prefixes are disjoint, so an entity can never be addressed
//! by both forms.

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Key space
// ============================================================================

/// Strip whitespace and one trailing `.0` (numeric-to-text artifact) from an EAN.
pub fn normalize_ean(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

/// Canonical address of one reconciled entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StockKey {
    /// Parent/standalone product, addressed by SKU
    Sku(String),
    /// Variant, addressed by its normalized EAN
    Ean(String),
}

impl StockKey {
    pub fn sku(sku: &str) -> Self {
        StockKey::Sku(sku.trim().to_string())
    }

    /// Build a variant key; the EAN is normalized first.
    pub fn ean(raw: &str) -> Self {
        StockKey::Ean(normalize_ean(raw))
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            StockKey::Sku(_) => EntityKind::Parent,
            StockKey::Ean(_) => EntityKind::Variant,
        }
    }

    /// The SKU or EAN value without prefix
    pub fn identifier(&self) -> &str {
        match self {
            StockKey::Sku(v) | StockKey::Ean(v) => v,
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockKey::Sku(sku) => write!(f, "sku:{}", sku),
            StockKey::Ean(ean) => write!(f, "ean:{}", ean),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Parent,
    Variant,
}

// ============================================================================
// Stock status
// ============================================================================

pub const STATUS_IN_STOCK: &str = "instock";
pub const STATUS_OUT_OF_STOCK: &str = "outofstock";

/// Availability as the platform spells it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StockStatus {
    InStock,
    OutOfStock,
    /// Any other platform status (e.g. `onbackorder`), kept verbatim
    Other(String),
}

impl StockStatus {
    /// Supplier availability is never read from the feed, only derived.
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }

    /// Parse an export status; blank means out of stock.
    pub fn parse_export(raw: &str) -> Self {
        match raw.trim() {
            "" | STATUS_OUT_OF_STOCK => StockStatus::OutOfStock,
            STATUS_IN_STOCK => StockStatus::InStock,
            other => StockStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StockStatus::InStock => STATUS_IN_STOCK,
            StockStatus::OutOfStock => STATUS_OUT_OF_STOCK,
            StockStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StockStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Parse a possibly fractional quantity, truncating toward zero.
///
/// Returns `None` for blank or unparsable text.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()?;
    value.trunc().to_i64()
}

// ============================================================================
// Supplier side
// ============================================================================

/// Stock fact derived from the supplier feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierStock {
    pub key: StockKey,
    /// Never negative; for a parent, the sum over its variants
    pub quantity: i64,
}

impl SupplierStock {
    pub fn parent(sku: &str, quantity: i64) -> Self {
        Self {
            key: StockKey::sku(sku),
            quantity: quantity.max(0),
        }
    }

    pub fn variant(ean: &str, quantity: i64) -> Self {
        Self {
            key: StockKey::ean(ean),
            quantity: quantity.max(0),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.key.kind()
    }

    pub fn identifier(&self) -> &str {
        self.key.identifier()
    }

    pub fn availability(&self) -> StockStatus {
        StockStatus::from_quantity(self.quantity)
    }
}

pub type SupplierStockMap = HashMap<StockKey, SupplierStock>;

// ============================================================================
// Platform side
// ============================================================================

/// Stock state of one addressable export row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub key: StockKey,
    /// SKU printed on the row (variants may carry one too)
    pub sku: Option<String>,
    /// Normalized EAN, variants only
    pub ean: Option<String>,
    pub current_quantity: i64,
    pub current_availability: StockStatus,
    /// Grouping id linking a variant to its parent row
    pub parent_reference: Option<String>,
    /// Opaque platform id, propagated for traceability
    pub record_id: Option<String>,
}

impl InventoryRecord {
    pub fn kind(&self) -> EntityKind {
        self.key.kind()
    }

    pub fn identifier(&self) -> &str {
        self.key.identifier()
    }

    fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            ean: self.ean.clone(),
            current_quantity: self.current_quantity,
            current_availability: self.current_availability.clone(),
            record_id: self.record_id.clone(),
            source_key: Some(self.key.clone()),
        }
    }
}

/// Export records in row order (later duplicates replace the value in place).
pub type InventoryMap = IndexMap<StockKey, InventoryRecord>;

/// Current platform state of one SKU, used for retention records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySnapshot {
    pub ean: Option<String>,
    pub current_quantity: i64,
    pub current_availability: StockStatus,
    pub record_id: Option<String>,
    /// Key of the mapped record this was taken from; `None` for unkeyed rows
    pub source_key: Option<StockKey>,
}

impl InventorySnapshot {
    pub fn is_keyed(&self) -> bool {
        self.source_key.is_some()
    }
}

/// Every distinct SKU seen in the export, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct IdentifierUniverse {
    entries: IndexMap<String, InventorySnapshot>,
}

impl IdentifierUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a SKU seen on an export row.
    ///
    /// An unkeyed row only fills the slot until a keyed row with the same SKU
    /// shows up. Among keyed rows the first key wins, and a later row with
    /// that same key replaces it, mirroring the keyed mapping.
    pub fn observe(&mut self, sku: &str, snapshot: InventorySnapshot) {
        match self.entries.get_mut(sku) {
            Some(existing) => {
                let replace = match (&existing.source_key, &snapshot.source_key) {
                    (None, Some(_)) => true,
                    (Some(held), Some(new)) => held == new,
                    _ => false,
                };
                if replace {
                    *existing = snapshot;
                }
            }
            None => {
                self.entries.insert(sku.to_string(), snapshot);
            }
        }
    }

    pub fn observe_record(&mut self, sku: &str, record: &InventoryRecord) {
        self.observe(sku, record.snapshot());
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.contains_key(sku)
    }

    pub fn get(&self, sku: &str) -> Option<&InventorySnapshot> {
        self.entries.get(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InventorySnapshot)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Supplier state differs from the platform
    Changed,
    /// Not in the feed; re-asserts the platform's own state
    Retained,
}

/// One row of the import file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub sku: Option<String>,
    pub ean: Option<String>,
    pub manage_stock: bool,
    pub stock_status: StockStatus,
    pub stock: i64,
    pub record_id: Option<String>,
    pub backorders: bool,
    pub origin: ChangeOrigin,
}

impl ChangeRecord {
    /// SKU or, if absent, EAN
    pub fn identifier(&self) -> &str {
        self.sku
            .as_deref()
            .or(self.ean.as_deref())
            .unwrap_or_default()
    }
}

/// Old/new values of one change-pass record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub identifier: String,
    pub record_id: Option<String>,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub old_status: StockStatus,
    pub new_status: StockStatus,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: stock {}→{}, status {}→{}",
            self.identifier, self.old_quantity, self.new_quantity, self.old_status, self.new_status
        )
    }
}
