//! Inventory export normalizer
//!
//! Reads the platform's flat CSV export into the keyed `InventoryRecord`
//! mapping and collects the Identifier Universe (every SKU seen on any row).

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::model::{
    normalize_ean, parse_quantity, IdentifierUniverse, InventoryMap, InventoryRecord,
    InventorySnapshot, StockKey, StockStatus,
};

/// Parent reference value meaning "no parent"
const NO_PARENT_MARKER: &str = "0";

/// Column names of the export dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumns {
    pub record_id: String,
    pub sku: String,
    pub ean: String,
    pub parent_reference: String,
    pub quantity: String,
    pub status: String,
}

impl Default for ExportColumns {
    fn default() -> Self {
        Self {
            record_id: "ID".to_string(),
            sku: "sku".to_string(),
            ean: "ean".to_string(),
            parent_reference: "post_parent".to_string(),
            quantity: "stock".to_string(),
            status: "stock_status".to_string(),
        }
    }
}

/// Header positions resolved against `ExportColumns`
struct ColumnIndex {
    record_id: Option<usize>,
    sku: usize,
    ean: Option<usize>,
    parent_reference: Option<usize>,
    quantity: Option<usize>,
    status: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ExportColumns) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let sku = find(&columns.sku).ok_or_else(|| SyncError::MissingColumn(columns.sku.clone()))?;
        let index = Self {
            record_id: find(&columns.record_id),
            sku,
            ean: find(&columns.ean),
            parent_reference: find(&columns.parent_reference),
            quantity: find(&columns.quantity),
            status: find(&columns.status),
        };
        for (name, idx) in [
            (&columns.ean, index.ean),
            (&columns.parent_reference, index.parent_reference),
            (&columns.quantity, index.quantity),
            (&columns.status, index.status),
        ] {
            if idx.is_none() {
                warn!("Export has no '{}' column; reading it as blank", name);
            }
        }
        Ok(index)
    }
}

/// One export row with blank fields folded to `None`
struct ExportRow<'r> {
    record_id: Option<&'r str>,
    sku: Option<&'r str>,
    ean: Option<&'r str>,
    parent_reference: Option<&'r str>,
    quantity: &'r str,
    status: &'r str,
}

impl<'r> ExportRow<'r> {
    fn read(record: &'r StringRecord, index: &ColumnIndex) -> Self {
        let field = |idx: Option<usize>| -> Option<&'r str> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        Self {
            record_id: field(index.record_id),
            sku: field(Some(index.sku)),
            ean: field(index.ean),
            parent_reference: field(index.parent_reference),
            quantity: field(index.quantity).unwrap_or(""),
            status: field(index.status).unwrap_or(""),
        }
    }

    fn has_parent(&self) -> bool {
        matches!(self.parent_reference, Some(p) if p != NO_PARENT_MARKER)
    }
}

/// How an export row maps onto the key space
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    Parent(StockKey),
    Variant(StockKey),
    /// Not addressable; only its SKU (if any) joins the universe
    Unkeyed,
}

fn classify(row: &ExportRow<'_>) -> RowClass {
    if let (Some(sku), false) = (row.sku, row.has_parent()) {
        return RowClass::Parent(StockKey::sku(sku));
    }
    if let (Some(ean), Some(_)) = (row.ean, row.parent_reference) {
        return RowClass::Variant(StockKey::ean(ean));
    }
    RowClass::Unkeyed
}

/// Normalized export plus parse statistics
#[derive(Debug, Default)]
pub struct InventoryExport {
    pub records: InventoryMap,
    pub universe: IdentifierUniverse,
    pub rows: usize,
    pub unkeyed_rows: usize,
    /// Rows whose quantity was present but unparsable
    pub coerced_quantities: usize,
}

/// Normalize export rows from any CSV reader.
pub fn normalize_export<R: Read>(reader: R, columns: &ExportColumns) -> Result<InventoryExport> {
    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut export = InventoryExport::default();
    let mut record = StringRecord::new();
    while csv_reader.read_record(&mut record)? {
        export.rows += 1;
        let row = ExportRow::read(&record, &index);

        let current_quantity = match parse_quantity(row.quantity) {
            Some(qty) => qty,
            None => {
                if !row.quantity.is_empty() {
                    export.coerced_quantities += 1;
                    debug!(
                        row = export.rows,
                        raw = row.quantity,
                        "Coercing export quantity to 0"
                    );
                }
                0
            }
        };
        let current_availability = StockStatus::parse_export(row.status);

        match classify(&row) {
            RowClass::Parent(key) | RowClass::Variant(key) => {
                let ean = match &key {
                    StockKey::Ean(_) => row.ean.map(normalize_ean),
                    StockKey::Sku(_) => None,
                };
                let inventory_record = InventoryRecord {
                    key: key.clone(),
                    sku: row.sku.map(str::to_string),
                    ean,
                    current_quantity,
                    current_availability,
                    parent_reference: match &key {
                        StockKey::Ean(_) => row.parent_reference.map(str::to_string),
                        StockKey::Sku(_) => None,
                    },
                    record_id: row.record_id.map(str::to_string),
                };
                if let Some(sku) = row.sku {
                    export.universe.observe_record(sku, &inventory_record);
                }
                if export.records.insert(key.clone(), inventory_record).is_some() {
                    debug!(%key, "Duplicate export key; later row wins");
                }
            }
            RowClass::Unkeyed => {
                export.unkeyed_rows += 1;
                if let Some(sku) = row.sku {
                    export.universe.observe(
                        sku,
                        InventorySnapshot {
                            ean: row.ean.map(normalize_ean),
                            current_quantity,
                            current_availability,
                            record_id: row.record_id.map(str::to_string),
                            source_key: None,
                        },
                    );
                }
            }
        }
    }

    if export.coerced_quantities > 0 {
        warn!(
            "Coerced {} unparsable export quantities to 0",
            export.coerced_quantities
        );
    }
    info!("Loaded {} platform products", export.records.len());
    info!("Found {} unique SKUs", export.universe.len());
    Ok(export)
}

/// Load and normalize the export file at `path`.
pub fn load_export(path: &Path, columns: &ExportColumns) -> Result<InventoryExport> {
    info!("Loading platform export: {}", path.display());
    if !path.exists() {
        return Err(SyncError::MissingInput(path.to_path_buf()));
    }
    let file = File::open(path)?;
    normalize_export(file, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::EntityKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "ID,sku,ean,post_parent,stock,stock_status\n";

    fn load(body: &str) -> InventoryExport {
        let csv = format!("{}{}", HEADER, body);
        normalize_export(csv.as_bytes(), &ExportColumns::default()).expect("export should parse")
    }

    #[test]
    fn test_parent_row() {
        let export = load("10,A,,,3.0,instock\n");
        let record = &export.records[&StockKey::sku("A")];
        assert_eq!(record.kind(), EntityKind::Parent);
        assert_eq!(record.current_quantity, 3);
        assert_eq!(record.current_availability, StockStatus::InStock);
        assert_eq!(record.record_id.as_deref(), Some("10"));
        assert_eq!(record.parent_reference, None);
        assert!(export.universe.contains("A"));
    }

    #[test]
    fn test_zero_parent_marker_means_parent() {
        let export = load("10,A,,0,1,instock\n");
        assert!(export.records.contains_key(&StockKey::sku("A")));
    }

    #[test]
    fn test_variant_row_strips_float_artifact() {
        let export = load("11,,8590000000001.0,10,2,instock\n");
        let record = &export.records[&StockKey::ean("8590000000001")];
        assert_eq!(record.kind(), EntityKind::Variant);
        assert_eq!(record.ean.as_deref(), Some("8590000000001"));
        assert_eq!(record.parent_reference.as_deref(), Some("10"));
        assert_eq!(record.sku, None);
        assert!(export.universe.is_empty());
    }

    #[test]
    fn test_variant_with_sku_joins_universe() {
        let export = load("12,A-RED,123,10,1,instock\n");
        let record = &export.records[&StockKey::ean("123")];
        assert_eq!(record.sku.as_deref(), Some("A-RED"));
        assert!(export.universe.contains("A-RED"));
        assert!(export.universe.get("A-RED").unwrap().is_keyed());
    }

    #[test]
    fn test_unaddressable_row_still_joins_universe() {
        // SKU but with a parent reference and no EAN: rule 3
        let export = load("13,ORPHAN,,10,4,instock\n,,,,,\n");
        assert!(export.records.is_empty());
        assert_eq!(export.unkeyed_rows, 2);
        let snapshot = export.universe.get("ORPHAN").expect("universe entry");
        assert!(!snapshot.is_keyed());
        assert_eq!(snapshot.current_quantity, 4);
    }

    #[test]
    fn test_blank_fields_default() {
        let export = load("14,B,,,,\n");
        let record = &export.records[&StockKey::sku("B")];
        assert_eq!(record.current_quantity, 0);
        assert_eq!(record.current_availability, StockStatus::OutOfStock);
        assert_eq!(export.coerced_quantities, 0);
    }

    #[test]
    fn test_unparsable_quantity_is_coerced() {
        let export = load("15,C,,,lots,instock\n16,D,,,-2.5,outofstock\n");
        assert_eq!(export.records[&StockKey::sku("C")].current_quantity, 0);
        assert_eq!(export.records[&StockKey::sku("D")].current_quantity, -2);
        assert_eq!(export.coerced_quantities, 1);
    }

    #[test]
    fn test_universe_has_no_duplicates() {
        let export = load("1,A,,,1,instock\n2,A,,,2,instock\n3,B,,,0,outofstock\n");
        assert_eq!(export.universe.len(), 2);
        assert_eq!(export.records.len(), 2);
        // later row wins in both the mapping and the universe
        assert_eq!(export.records[&StockKey::sku("A")].current_quantity, 2);
        let snapshot = export.universe.get("A").unwrap();
        assert_eq!(snapshot.current_quantity, 2);
        assert_eq!(snapshot.record_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_records_keep_row_order() {
        let export = load("1,Z,,,1,instock\n2,,5,1,1,instock\n3,A,,,1,instock\n");
        let keys: Vec<String> = export.records.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["sku:Z", "ean:5", "sku:A"]);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let export = load("1,A\n");
        assert_eq!(export.records[&StockKey::sku("A")].current_quantity, 0);
    }

    #[test]
    fn test_custom_columns() {
        let columns = ExportColumns {
            sku: "SKU".to_string(),
            quantity: "Qty".to_string(),
            ..ExportColumns::default()
        };
        let csv = "SKU,Qty,stock_status\nX,5,instock\n";
        let export = normalize_export(csv.as_bytes(), &columns).unwrap();
        assert_eq!(export.records[&StockKey::sku("X")].current_quantity, 5);
    }

    #[test]
    fn test_missing_identifier_column_is_fatal() {
        let err = normalize_export("ean,stock\n1,2\n".as_bytes(), &ExportColumns::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingColumn(ref c) if c == "sku"));
        assert_eq!(err.kind(), ErrorKind::StructuralParse);
    }

    #[test]
    fn test_load_export_missing_file() {
        let err = load_export(Path::new("/nonexistent/export.csv"), &ExportColumns::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_load_export_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}20,F,,,7,instock\n", HEADER).unwrap();
        let export = load_export(file.path(), &ExportColumns::default()).unwrap();
        assert_eq!(export.rows, 1);
        assert_eq!(export.records[&StockKey::sku("F")].current_quantity, 7);
    }
}
