//! Import file dialects
//!
//! One canonical `ChangeRecord` projected onto the column set a given import
//! tool expects. The reconciliation never depends on the dialect.

use serde::Serialize;

use crate::model::{AuditEntry, ChangeRecord};

pub const YES: &str = "yes";
pub const NO: &str = "no";

/// Import column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportField {
    RecordId,
    Sku,
    Ean,
    ManageStock,
    StockStatus,
    Stock,
    Backorders,
}

impl ImportField {
    /// Header as the platform's import tool spells it
    pub fn header(&self) -> &'static str {
        match self {
            ImportField::RecordId => "ID",
            ImportField::Sku => "sku",
            ImportField::Ean => "ean",
            ImportField::ManageStock => "manage_stock",
            ImportField::StockStatus => "stock_status",
            ImportField::Stock => "stock",
            ImportField::Backorders => "backorders",
        }
    }

    pub fn render(&self, record: &ChangeRecord) -> String {
        match self {
            ImportField::RecordId => record.record_id.clone().unwrap_or_default(),
            ImportField::Sku => record.sku.clone().unwrap_or_default(),
            ImportField::Ean => record.ean.clone().unwrap_or_default(),
            ImportField::ManageStock => flag(record.manage_stock).to_string(),
            ImportField::StockStatus => record.stock_status.to_string(),
            ImportField::Stock => record.stock.to_string(),
            ImportField::Backorders => flag(record.backorders).to_string(),
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        YES
    } else {
        NO
    }
}

const STANDARD_FIELDS: &[ImportField] = &[
    ImportField::Sku,
    ImportField::Ean,
    ImportField::ManageStock,
    ImportField::StockStatus,
    ImportField::Stock,
];

const LEGACY_FIELDS: &[ImportField] = &[
    ImportField::RecordId,
    ImportField::Sku,
    ImportField::Ean,
    ImportField::ManageStock,
    ImportField::StockStatus,
    ImportField::Stock,
    ImportField::Backorders,
];

/// Import file dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputDialect {
    /// sku, ean, manage_stock, stock_status, stock
    #[default]
    Standard,
    /// Standard plus the platform record ID and a backorders flag
    Legacy,
}

impl OutputDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputDialect::Standard => "standard",
            OutputDialect::Legacy => "legacy",
        }
    }

    pub fn fields(&self) -> &'static [ImportField] {
        match self {
            OutputDialect::Standard => STANDARD_FIELDS,
            OutputDialect::Legacy => LEGACY_FIELDS,
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.fields().iter().map(ImportField::header).collect()
    }

    pub fn project(&self, record: &ChangeRecord) -> Vec<String> {
        self.fields().iter().map(|f| f.render(record)).collect()
    }

    /// One change-log line
    pub fn audit_line(&self, entry: &AuditEntry) -> String {
        match (self, entry.record_id.as_deref()) {
            (OutputDialect::Legacy, Some(id)) => format!("ID: {}, {}", id, entry),
            _ => entry.to_string(),
        }
    }
}
