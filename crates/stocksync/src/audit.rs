//! Audit sinks
//!
//! The orchestrator owns one `AuditSink` per run and hands every change-pass
//! entry to it. The change log file itself is written through the run's sink
//! registry; these sinks mirror entries elsewhere (tracing, memory for tests).

use tracing::info;

use crate::dialect::OutputDialect;
use crate::model::AuditEntry;

pub trait AuditSink {
    fn record(&mut self, dialect: OutputDialect, entry: &AuditEntry);
}

/// Emits each entry as an `info!` event
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, dialect: OutputDialect, entry: &AuditEntry) {
        info!(target: "stocksync::audit", "{}", dialect.audit_line(entry));
    }
}

/// Keeps rendered lines in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    pub lines: Vec<String>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&mut self, dialect: OutputDialect, entry: &AuditEntry) {
        self.lines.push(dialect.audit_line(entry));
    }
}

/// Header lines of the change log file
pub fn change_log_header(display_time: &str) -> [String; 3] {
    [
        "=== STOCK CHANGE LOG ===".to_string(),
        format!("Time: {}", display_time),
        String::new(),
    ]
}
