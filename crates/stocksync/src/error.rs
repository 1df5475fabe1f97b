//! Error types for a sync run

use std::io;
use std::path::PathBuf;
use stocksync_sinks::SinkError;
use thiserror::Error;

/// Where an error sits in the run's failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing feed URL, missing input file, nothing archived
    Configuration,
    /// Feed fetch failed (connect, timeout, non-success status)
    Transport,
    /// Unparseable XML or CSV
    StructuralParse,
    /// Failure writing run artifacts
    Output,
}

/// Sync error type
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "Supplier feed URL is not configured (set {} or pass --feed-url)",
        crate::config::FEED_URL_ENV
    )]
    MissingFeedUrl,

    #[error("No archived feed ({}_*.xml) in {}", stocksync_sinks::FEED_ARCHIVE_PREFIX, .dir.display())]
    NoArchivedFeed { dir: PathBuf },

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Failed to fetch feed from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export is missing required column '{0}'")]
    MissingColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MissingFeedUrl
            | SyncError::NoArchivedFeed { .. }
            | SyncError::MissingInput(_) => ErrorKind::Configuration,
            SyncError::Transport { .. } | SyncError::HttpStatus { .. } => ErrorKind::Transport,
            SyncError::Xml(_)
            | SyncError::MalformedFeed(_)
            | SyncError::Csv(_)
            | SyncError::MissingColumn(_) => ErrorKind::StructuralParse,
            SyncError::Io(_) | SyncError::Sink(_) => ErrorKind::Output,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SyncError>;
