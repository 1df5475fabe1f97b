//! Shared logging utilities for the stocksync binary.
//!
//! Every run writes its own log file (`<app_name>_<stamp>.log`) next to the
//! other run artifacts, mirrored to stderr. Old run logs are pruned at init.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "stocksync=info,stocksync_sinks=info";
pub const DEFAULT_KEEP_RUN_LOGS: usize = 30;

/// Logging configuration for one run.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Run stamp embedded in the log file name (e.g. `20261019_142501`)
    pub stamp: &'a str,
    /// Directory holding per-run log files
    pub logs_dir: PathBuf,
    pub verbose: bool,
    /// How many run logs to keep, including the new one
    pub keep: usize,
}

/// Initialize tracing with a per-run file writer and stderr output.
///
/// Returns the path of the run log file.
pub fn init_logging(config: LogConfig<'_>) -> Result<PathBuf> {
    let writer = RunLogWriter::create(&config.logs_dir, config.app_name, config.stamp)
        .context("Failed to initialize run log writer")?;
    let log_path = writer.path.clone();

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        EnvFilter::new("stocksync=debug,stocksync_sinks=debug")
    } else {
        file_filter.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    match prune_run_logs(&config.logs_dir, config.app_name, config.keep) {
        Ok(removed) if removed > 0 => {
            tracing::debug!(removed, "Pruned old run logs");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!("Failed to prune old run logs: {}", err),
    }

    Ok(log_path)
}

/// Initialize console-only logging, used when the logs directory is unusable.
pub fn init_console_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stocksync=debug,stocksync_sinks=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

/// Path of the run log for `app_name` at `stamp`.
pub fn run_log_path(logs_dir: &Path, app_name: &str, stamp: &str) -> PathBuf {
    logs_dir.join(format!("{}_{}.log", sanitize_name(app_name), stamp))
}

/// Remove the oldest run logs of `app_name` so that at most `keep` remain.
///
/// Stamps sort lexically, so file-name order is chronological order.
pub fn prune_run_logs(logs_dir: &Path, app_name: &str, keep: usize) -> io::Result<usize> {
    let prefix = format!("{}_", sanitize_name(app_name));
    let mut logs: Vec<PathBuf> = fs::read_dir(logs_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect();
    logs.sort();

    let keep = keep.max(1);
    if logs.len() <= keep {
        return Ok(0);
    }
    let excess = logs.len() - keep;
    for path in &logs[..excess] {
        fs::remove_file(path)?;
    }
    Ok(excess)
}

#[derive(Clone)]
struct RunLogWriter {
    path: PathBuf,
    inner: Arc<Mutex<File>>,
}

impl RunLogWriter {
    fn create(dir: &Path, app_name: &str, stamp: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
        let path = run_log_path(dir, app_name, stamp);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct RunLogWriterGuard {
    inner: Arc<Mutex<File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RunLogWriter {
    type Writer = RunLogWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for RunLogWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_log_path_sanitizes_app_name() {
        let path = run_log_path(Path::new("/tmp/logs"), "stock sync", "20260101_000000");
        assert_eq!(path, PathBuf::from("/tmp/logs/stock_sync_20260101_000000.log"));
    }

    #[test]
    fn test_prune_keeps_newest_logs() {
        let dir = TempDir::new().expect("create temp dir");
        for stamp in ["20260101_000000", "20260102_000000", "20260103_000000"] {
            fs::write(run_log_path(dir.path(), "stock_sync", stamp), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "keep me").unwrap();

        let removed = prune_run_logs(dir.path(), "stock_sync", 2).expect("prune");
        assert_eq!(removed, 1);
        assert!(!run_log_path(dir.path(), "stock_sync", "20260101_000000").exists());
        assert!(run_log_path(dir.path(), "stock_sync", "20260103_000000").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(run_log_path(dir.path(), "stock_sync", "20260101_000000"), "x").unwrap();
        assert_eq!(prune_run_logs(dir.path(), "stock_sync", 5).unwrap(), 0);
    }

    #[test]
    fn test_run_log_writer_appends() {
        let dir = TempDir::new().expect("create temp dir");
        let writer = RunLogWriter::create(dir.path(), "stock_sync", "20260101_000000")
            .expect("create writer");
        let mut guard = tracing_subscriber::fmt::MakeWriter::make_writer(&writer);
        guard.write_all(b"hello\n").unwrap();
        guard.flush().unwrap();

        let contents = fs::read_to_string(&writer.path).unwrap();
        assert_eq!(contents, "hello\n");
    }
}
