//! Run configuration
//!
//! Feed URL and data directory come from the environment (`.env` is loaded
//! first); everything else from CLI flags. Resolution happens once per run.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dialect::OutputDialect;
use crate::error::{Result, SyncError};
use crate::inventory::ExportColumns;
use crate::source::{ArchivedFeedSource, FeedSource, HttpFeedSource};

pub const FEED_URL_ENV: &str = "B2B_FEED_URL";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DIALECT_ENV: &str = "STOCKSYNC_DIALECT";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_EXPORT_FILE: &str = "webtoffee_products_all.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const LOG_APP_NAME: &str = "stock_sync";

/// Load `.env` from the working directory if present.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Logs directory: `<data_dir>/logs`
pub fn logs_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Resolved configuration of one sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    pub feed_url: Option<String>,
    pub data_dir: PathBuf,
    pub export_path: PathBuf,
    pub skip_download: bool,
    pub dialect: OutputDialect,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub whatif: bool,
    #[serde(skip)]
    pub export_columns: ExportColumns,
}

impl SyncConfig {
    pub fn new(data_dir: impl Into<PathBuf>, export_path: impl Into<PathBuf>) -> Self {
        Self {
            feed_url: None,
            data_dir: data_dir.into(),
            export_path: export_path.into(),
            skip_download: false,
            dialect: OutputDialect::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            whatif: false,
            export_columns: ExportColumns::default(),
        }
    }

    /// Feed URL, blank treated as missing
    pub fn feed_url(&self) -> Option<&str> {
        self.feed_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Fail fast on configuration errors, before any processing.
    pub fn validate(&self) -> Result<()> {
        if !self.export_path.exists() {
            return Err(SyncError::MissingInput(self.export_path.clone()));
        }
        if !self.skip_download && self.feed_url().is_none() {
            return Err(SyncError::MissingFeedUrl);
        }
        Ok(())
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Feed source chosen by the skip-download flag
    pub fn feed_source(&self) -> Result<Box<dyn FeedSource>> {
        if self.skip_download {
            return Ok(Box::new(ArchivedFeedSource::new(&self.data_dir)));
        }
        let url = self.feed_url().ok_or(SyncError::MissingFeedUrl)?;
        Ok(Box::new(HttpFeedSource::new(
            url,
            &self.data_dir,
            self.timeout,
        )))
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn config_with_export(dir: &TempDir) -> SyncConfig {
        let export = dir.path().join("export.csv");
        std::fs::write(&export, "sku\n").unwrap();
        SyncConfig::new(dir.path().join("data"), export)
    }

    #[test]
    fn test_missing_export_is_config_error() {
        let config = SyncConfig::new("./data", "/nonexistent/export.csv");
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, SyncError::MissingInput(_)));
    }

    #[test]
    fn test_missing_feed_url_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_export(&dir);
        config.feed_url = Some("   ".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SyncError::MissingFeedUrl));
    }

    #[test]
    fn test_skip_download_does_not_need_url() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_export(&dir);
        config.skip_download = true;
        config.validate().unwrap();
        assert!(config.feed_source().unwrap().describe().contains("latest archive"));
    }

    #[test]
    fn test_feed_source_download() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_export(&dir);
        config.feed_url = Some("https://supplier.example/feed.xml".to_string());
        config.validate().unwrap();
        assert_eq!(
            config.feed_source().unwrap().describe(),
            "download from https://supplier.example/feed.xml"
        );
    }

    #[test]
    fn test_config_json_shape() {
        let config = SyncConfig::new("./data", "export.csv");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["timeout"], 300);
        assert_eq!(value["dialect"], "standard");
        assert!(value.get("export_columns").is_none());
    }
}
