//! `stocksync sync` - one reconciliation run

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use stocksync::config::{DEFAULT_EXPORT_FILE, DEFAULT_TIMEOUT_SECS, DIALECT_ENV, FEED_URL_ENV};
use stocksync::{run_sync, Clock, OutputDialect, SyncConfig, TracingAuditSink};

use crate::cli::error::HelpfulError;

/// Arguments for the sync command
#[derive(Debug, Clone, clap::Args)]
pub struct SyncArgs {
    /// Inventory export CSV
    #[arg(short = 'f', long = "file", default_value = DEFAULT_EXPORT_FILE)]
    pub file: PathBuf,

    /// Supplier feed URL
    #[arg(long, env = FEED_URL_ENV)]
    pub feed_url: Option<String>,

    /// Skip downloading; use the most recent archived feed
    #[arg(long)]
    pub no_download: bool,

    /// Import file dialect
    #[arg(long, value_enum, env = DIALECT_ENV, default_value_t = OutputDialect::Standard)]
    pub dialect: OutputDialect,

    /// Feed request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Reconcile and report, but write no import or change log
    #[arg(long)]
    pub whatif: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn to_config(&self, data_dir: &Path) -> SyncConfig {
        let mut config = SyncConfig::new(data_dir, &self.file);
        config.feed_url = self.feed_url.clone();
        config.skip_download = self.no_download;
        config.dialect = self.dialect;
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.whatif = self.whatif;
        config
    }
}

/// Run the sync command
pub fn run(args: SyncArgs, data_dir: &Path, clock: &dyn Clock) -> Result<()> {
    let config = args.to_config(data_dir);
    let source = match config.validate().and_then(|()| config.feed_source()) {
        Ok(source) => source,
        Err(err) => {
            error!("Configuration error: {}", err);
            return Err(HelpfulError::from(err).into());
        }
    };
    let mut audit = TracingAuditSink;

    let summary = match run_sync(&config, source.as_ref(), clock, &mut audit) {
        Ok(summary) => summary,
        Err(err) => {
            error!("An error occurred: {}", err);
            return Err(HelpfulError::from(err).into());
        }
    };

    for line in summary.render_text() {
        info!("{}", line);
    }
    info!("End time: {}", clock.display_time());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if let Some(path) = &summary.import_file {
        println!("Import file: {} ({} rows)", path.display(), summary.total_rows());
        println!("You can now import this file using WebToffee Import");
    } else if summary.whatif {
        println!("What-if run, nothing written");
    } else {
        println!("Stock levels are up to date, no import needed");
    }
    Ok(())
}
