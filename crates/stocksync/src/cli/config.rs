//! `stocksync config` - show the resolved configuration

use std::path::Path;

use stocksync::config::{logs_dir, FEED_URL_ENV};

use crate::cli::sync::SyncArgs;

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub sync: SyncArgs,
}

/// Run the config command - shows what a sync run would use
pub fn run(args: ConfigArgs, data_dir: &Path) -> anyhow::Result<()> {
    let config = args.sync.to_config(data_dir);
    let logs = logs_dir(&config.data_dir);

    if args.sync.json {
        let value = serde_json::json!({
            "config": config,
            "export_exists": config.export_path.exists(),
            "data_dir_exists": config.data_dir.exists(),
            "logs_dir": logs.to_string_lossy(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("STOCKSYNC CONFIGURATION");
    println!("=======================");
    println!();
    println!(
        "Feed URL:   {}",
        config
            .feed_url()
            .map(str::to_string)
            .unwrap_or_else(|| format!("(not set, {})", FEED_URL_ENV))
    );
    println!(
        "Feed mode:  {}",
        if config.skip_download {
            "latest archive"
        } else {
            "download"
        }
    );
    println!(
        "Export:     {} ({})",
        config.export_path.display(),
        if config.export_path.exists() {
            "exists"
        } else {
            "not found"
        }
    );
    println!(
        "Data dir:   {} ({})",
        config.data_dir.display(),
        if config.data_dir.exists() {
            "exists"
        } else {
            "not found"
        }
    );
    println!("Logs:       {}", logs.display());
    println!("Dialect:    {}", config.dialect.as_str());
    println!("Timeout:    {}s", config.timeout.as_secs());
    println!("What-if:    {}", if config.whatif { "yes" } else { "no" });

    Ok(())
}
