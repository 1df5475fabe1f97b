//! Stocksync launcher
//!
//! Reconciles the supplier stock feed against the store's product export and
//! writes an import file for the store's CSV importer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use stocksync::config::{load_dotenv, logs_dir, DATA_DIR_ENV, DEFAULT_DATA_DIR, LOG_APP_NAME};
use stocksync::{Clock, SystemClock};
use stocksync_logging::{init_console_logging, init_logging, LogConfig, DEFAULT_KEEP_RUN_LOGS};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "stocksync", about = "Supplier feed to store inventory stock sync")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Directory for feed archives, import files, change logs and run logs
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the feed, reconcile, and write the import file
    Sync(cli::sync::SyncArgs),

    /// Show the resolved configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> ExitCode {
    load_dotenv();
    let cli = Cli::parse();
    let clock = SystemClock;

    let result = match cli.command {
        Commands::Sync(args) => {
            let stamp = clock.stamp();
            let log_config = LogConfig {
                app_name: LOG_APP_NAME,
                stamp: &stamp,
                logs_dir: logs_dir(&cli.data_dir),
                verbose: cli.verbose,
                keep: DEFAULT_KEEP_RUN_LOGS,
            };
            match init_logging(log_config) {
                Ok(path) => info!("Run log: {}", path.display()),
                Err(err) => {
                    eprintln!("Warning: file logging unavailable: {:#}", err);
                    init_console_logging(cli.verbose);
                }
            }
            cli::sync::run(args, &cli.data_dir, &clock)
        }
        Commands::Config(args) => {
            init_console_logging(cli.verbose);
            cli::config::run(args, &cli.data_dir)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}
