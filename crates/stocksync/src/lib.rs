//! Stocksync - Core Library
//!
//! Supplier stock feed vs. store inventory export reconciliation.

pub mod audit;
pub mod clock;
pub mod config;
pub mod dialect;
pub mod error;
pub mod feed;
pub mod inventory;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod source;

pub use audit::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SyncConfig;
pub use dialect::OutputDialect;
pub use error::{ErrorKind, Result, SyncError};
pub use feed::{normalize_feed, SupplierFeed};
pub use inventory::{load_export, normalize_export, ExportColumns, InventoryExport};
pub use model::{ChangeRecord, StockKey, StockStatus};
pub use pipeline::{run_sync, RunSummary};
pub use reconcile::{reconcile, Reconciliation};
pub use source::{ArchivedFeedSource, FeedPayload, FeedSource, HttpFeedSource};
pub use stocksync_sinks as sinks;
