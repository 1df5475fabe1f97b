//! Sync run orchestrator
//!
//! One run, strictly sequential:
//!
//! 1. validate configuration (export present, feed URL when downloading)
//! 2. load the feed bytes (download + archive, or latest archive)
//! 3. normalize feed and export
//! 4. reconcile
//! 5. stage import CSV and change log, commit both together
//!
//! Any failure before step 5 leaves no import or change log behind.

use serde::Serialize;
use std::path::PathBuf;
use stocksync_sinks::{CsvSink, SinkRegistry, TextSink, CHANGE_LOG_PREFIX, IMPORT_PREFIX};
use tracing::{info, warn};

use crate::audit::{change_log_header, AuditSink};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::dialect::OutputDialect;
use crate::error::Result;
use crate::feed::normalize_feed;
use crate::inventory::load_export;
use crate::reconcile::{reconcile, Reconciliation};
use crate::source::FeedSource;

const IMPORT_SINK: &str = "import";
const CHANGE_LOG_SINK: &str = "change_log";

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stamp: String,
    pub started_at: String,
    pub dialect: OutputDialect,
    pub whatif: bool,
    /// Distinct SKUs in the export
    pub universe: usize,
    pub supplier_entries: usize,
    pub inventory_records: usize,
    pub matched: usize,
    pub changed: usize,
    pub retained: usize,
    pub feed_archive: Option<PathBuf>,
    pub import_file: Option<PathBuf>,
    pub change_log: Option<PathBuf>,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.changed + self.retained
    }

    /// Human-readable summary block
    pub fn render_text(&self) -> Vec<String> {
        let mut lines = vec![
            "=== SUMMARY ===".to_string(),
            format!("Total SKUs in inventory: {}", self.universe),
            format!("Changes detected: {}", self.changed),
            format!("Retained SKUs: {}", self.retained),
        ];
        if self.whatif {
            lines.push(format!(
                "What-if: {} rows would be written (dialect {})",
                self.total_rows(),
                self.dialect.as_str()
            ));
        }
        match &self.import_file {
            Some(path) => lines.push(format!("Import file: {}", path.display())),
            None if !self.whatif => lines.push("Import file: none (nothing to update)".to_string()),
            None => {}
        }
        if let Some(path) = &self.change_log {
            lines.push(format!("Change log: {}", path.display()));
        }
        if let Some(path) = &self.feed_archive {
            lines.push(format!("Feed archive: {}", path.display()));
        }
        lines
    }
}

/// Run one synchronization.
pub fn run_sync(
    config: &SyncConfig,
    source: &dyn FeedSource,
    clock: &dyn Clock,
    audit: &mut dyn AuditSink,
) -> Result<RunSummary> {
    let stamp = clock.stamp();
    let started_at = clock.display_time();
    info!("=== STOCK SYNC STARTED ===");
    info!("Time: {}", started_at);

    config.validate()?;
    config.ensure_data_dir()?;

    info!("Feed source: {}", source.describe());
    let payload = source.load(&stamp)?;
    let feed = normalize_feed(&payload.bytes)?;
    let export = load_export(&config.export_path, &config.export_columns)?;

    let result = reconcile(&feed.stock, &export);
    for entry in &result.audit {
        audit.record(config.dialect, entry);
    }

    let mut summary = RunSummary {
        stamp: stamp.clone(),
        started_at: started_at.clone(),
        dialect: config.dialect,
        whatif: config.whatif,
        universe: export.universe.len(),
        supplier_entries: feed.len(),
        inventory_records: export.records.len(),
        matched: result.matched,
        changed: result.changed,
        retained: result.retained,
        feed_archive: payload.archive,
        import_file: None,
        change_log: None,
    };

    if config.whatif {
        info!("What-if mode: no import or change log written");
        return Ok(summary);
    }
    if result.is_empty() {
        info!("No changes detected");
        return Ok(summary);
    }

    let mut committed = write_outputs(config, &stamp, &started_at, &result)?;
    summary.import_file = committed.remove(IMPORT_SINK);
    summary.change_log = committed.remove(CHANGE_LOG_SINK);
    Ok(summary)
}

fn write_outputs(
    config: &SyncConfig,
    stamp: &str,
    started_at: &str,
    result: &Reconciliation,
) -> Result<std::collections::BTreeMap<String, PathBuf>> {
    let dialect = config.dialect;
    let mut registry = SinkRegistry::new();

    let mut import = CsvSink::new(&config.data_dir, IMPORT_PREFIX, stamp, &dialect.header())?;
    for record in &result.changes {
        if let Err(err) = import.write_row(dialect.project(record)) {
            registry.add_csv(IMPORT_SINK, import);
            registry.abort();
            return Err(err.into());
        }
    }
    info!("Import file staged: {} rows", import.rows_written());
    registry.add_csv(IMPORT_SINK, import);

    if !result.audit.is_empty() {
        let mut log = TextSink::new(&config.data_dir, CHANGE_LOG_PREFIX, stamp)?;
        let lines = change_log_header(started_at)
            .into_iter()
            .chain(result.audit.iter().map(|entry| dialect.audit_line(entry)));
        for line in lines {
            if let Err(err) = log.write_line(&line) {
                registry.add_text(CHANGE_LOG_SINK, log);
                registry.abort();
                return Err(err.into());
            }
        }
        registry.add_text(CHANGE_LOG_SINK, log);
    }

    let committed = registry.finish().map_err(|err| {
        warn!("Failed to commit run artifacts: {}", err);
        err
    })?;
    for path in committed.values() {
        info!("Written: {}", path.display());
    }
    Ok(committed)
}
