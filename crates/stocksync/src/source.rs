//! Feed sources
//!
//! Where the raw feed bytes come from: one HTTP GET (archived before use) or
//! the newest archive already in the data directory.

use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stocksync_sinks::{latest_artifact, write_archive, FEED_ARCHIVE_PREFIX};
use tracing::{error, info};

use crate::error::{Result, SyncError};

/// Raw feed document plus where it was kept
#[derive(Debug, Clone)]
pub struct FeedPayload {
    pub bytes: Vec<u8>,
    /// Archive file holding these bytes
    pub archive: Option<PathBuf>,
}

pub trait FeedSource {
    /// Short human-readable origin, for logs
    fn describe(&self) -> String;

    /// Fetch the feed. `stamp` names any archive written on the way.
    fn load(&self, stamp: &str) -> Result<FeedPayload>;
}

/// Downloads the feed and archives it under the data directory
pub struct HttpFeedSource {
    url: String,
    data_dir: PathBuf,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, data_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            data_dir: data_dir.into(),
            timeout,
        }
    }

    fn download(&self) -> Result<Vec<u8>> {
        let transport = |source: reqwest::Error| SyncError::Transport {
            url: self.url.clone(),
            source,
        };
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;
        let response = client.get(&self.url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

impl FeedSource for HttpFeedSource {
    fn describe(&self) -> String {
        format!("download from {}", self.url)
    }

    fn load(&self, stamp: &str) -> Result<FeedPayload> {
        info!("Downloading supplier feed...");
        let bytes = self.download().map_err(|err| {
            error!("Error downloading feed: {}", err);
            err
        })?;
        let archive = write_archive(&self.data_dir, FEED_ARCHIVE_PREFIX, stamp, "xml", &bytes)?;
        info!(
            "Feed downloaded: {}",
            archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        Ok(FeedPayload {
            bytes,
            archive: Some(archive),
        })
    }
}

/// Re-reads the newest feed archive (skip-download mode)
pub struct ArchivedFeedSource {
    data_dir: PathBuf,
}

impl ArchivedFeedSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn latest(&self) -> Result<PathBuf> {
        latest_artifact(&self.data_dir, FEED_ARCHIVE_PREFIX, "xml")?.ok_or_else(|| {
            SyncError::NoArchivedFeed {
                dir: self.data_dir.clone(),
            }
        })
    }
}

impl FeedSource for ArchivedFeedSource {
    fn describe(&self) -> String {
        format!("latest archive in {}", self.data_dir.display())
    }

    fn load(&self, _stamp: &str) -> Result<FeedPayload> {
        let path = self.latest()?;
        info!("Using archived feed: {}", path.display());
        let bytes = read_feed_file(&path)?;
        Ok(FeedPayload {
            bytes,
            archive: Some(path),
        })
    }
}

fn read_feed_file(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}
