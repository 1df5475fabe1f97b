//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

use stocksync::config::{DATA_DIR_ENV, FEED_URL_ENV};
use stocksync::{ErrorKind, SyncError};

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Export file does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The inventory export file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                "TRY: Pass the export explicitly: stocksync sync -f <export.csv>".to_string(),
            ])
    }

    /// Download requested but no feed URL configured
    pub fn missing_feed_url() -> Self {
        Self::new("Supplier feed URL is not configured")
            .with_context("A download was requested but no feed URL is set")
            .with_suggestions([
                format!("TRY: Set {} in the environment or in .env", FEED_URL_ENV),
                "TRY: Pass it on the command line: --feed-url <URL>".to_string(),
                "TRY: Reuse the last downloaded feed: --no-download".to_string(),
            ])
    }

    /// Skip-download mode but nothing archived yet
    pub fn no_archived_feed(details: &str) -> Self {
        Self::new("No archived supplier feed found")
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: Run once without --no-download to fetch the feed".to_string(),
                format!("TRY: Check the data directory ({} or --data-dir)", DATA_DIR_ENV),
            ])
    }

    /// Feed could not be fetched
    pub fn feed_unreachable(details: &str) -> Self {
        Self::new("Supplier feed could not be downloaded")
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: Check network access to the supplier".to_string(),
                "TRY: Raise the request timeout: --timeout-secs <N>".to_string(),
                "TRY: Reuse the last downloaded feed: --no-download".to_string(),
            ])
    }

    /// Map a run failure onto a user-facing error.
    pub fn from_sync_error(err: &SyncError) -> Self {
        match err {
            SyncError::MissingInput(path) => Self::file_not_found(path),
            SyncError::MissingFeedUrl => Self::missing_feed_url(),
            SyncError::NoArchivedFeed { .. } => Self::no_archived_feed(&err.to_string()),
            _ if err.kind() == ErrorKind::Transport => Self::feed_unreachable(&err.to_string()),
            SyncError::MissingColumn(_) | SyncError::Csv(_) => Self::new(err.to_string())
                .with_context("Failed to parse the inventory export")
                .with_suggestion("TRY: Re-export the product list with the sku column included"),
            _ if err.kind() == ErrorKind::StructuralParse => Self::new(err.to_string())
                .with_context("Failed to parse the supplier feed")
                .with_suggestion("TRY: Inspect the archived feed in the data directory"),
            _ => Self::new(err.to_string()),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

impl From<SyncError> for HelpfulError {
    fn from(err: SyncError) -> Self {
        Self::from_sync_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While processing data")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While processing data"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_missing_export_maps_to_file_not_found() {
        let err = SyncError::MissingInput(PathBuf::from("/nonexistent/export.csv"));
        let display = HelpfulError::from(err).to_string();
        assert!(display.contains("File not found: /nonexistent/export.csv"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_missing_url_mentions_env_var() {
        let display = HelpfulError::from(SyncError::MissingFeedUrl).to_string();
        assert!(display.contains(FEED_URL_ENV));
        assert!(display.contains("--no-download"));
    }

    #[test]
    fn test_no_archive_keeps_details() {
        let err = SyncError::NoArchivedFeed {
            dir: PathBuf::from("./data"),
        };
        let helpful = HelpfulError::from(err);
        assert_eq!(helpful.message, "No archived supplier feed found");
        assert!(helpful.context.unwrap().contains("./data"));
    }

    #[test]
    fn test_parse_errors_get_context() {
        let helpful = HelpfulError::from(SyncError::MissingColumn("sku".to_string()));
        assert_eq!(
            helpful.context.as_deref(),
            Some("Failed to parse the inventory export")
        );

        let helpful = HelpfulError::from(SyncError::MalformedFeed("no root".to_string()));
        assert_eq!(helpful.context.as_deref(), Some("Failed to parse the supplier feed"));
    }
}
