//! Staged file writers for run artifacts.
//!
//! Every artifact of a run (import CSV, change log, feed archive) is written
//! to a hidden temp file first and renamed into place on commit, so a run
//! that fails midway never leaves a partial artifact behind. Sinks handle:
//! - Artifact naming from the run stamp
//! - Temp staging and atomic promotion
//! - Rollback of every sink in a registry when one commit fails

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const FEED_ARCHIVE_PREFIX: &str = "b2b_feed";
pub const IMPORT_PREFIX: &str = "import";
pub const CHANGE_LOG_PREFIX: &str = "change_log";

/// Artifact file name: `{prefix}_{stamp}.{extension}`
pub fn output_filename(prefix: &str, stamp: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, stamp, extension)
}

fn temp_filename(filename: &str) -> String {
    format!(".{}.tmp", filename)
}

/// Errors returned by sink staging and writing.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{message}")]
    Message { message: String },
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },
    #[error("{message}")]
    Csv {
        message: String,
        #[source]
        source: csv::Error,
    },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

impl SinkError {
    fn message(message: impl Into<String>) -> Self {
        SinkError::Message {
            message: message.into(),
        }
    }

    fn io(message: impl Into<String>, source: io::Error) -> Self {
        SinkError::Io {
            message: message.into(),
            source,
        }
    }
}

/// Temp/final path pair shared by all sinks.
#[derive(Debug)]
struct StagedFile {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn create(output_dir: &Path, filename: &str) -> SinkResult<(Self, File)> {
        fs::create_dir_all(output_dir).map_err(|e| {
            SinkError::io(
                format!("Failed to create output directory: {}", output_dir.display()),
                e,
            )
        })?;
        let final_path = output_dir.join(filename);
        let temp_path = output_dir.join(temp_filename(filename));
        let file = File::create(&temp_path).map_err(|e| {
            SinkError::io(
                format!("Failed to create temp file: {}", temp_path.display()),
                e,
            )
        })?;
        Ok((
            Self {
                temp_path: Some(temp_path),
                final_path,
                committed: false,
            },
            file,
        ))
    }

    fn commit(&mut self) -> SinkResult<PathBuf> {
        if let Some(temp_path) = &self.temp_path {
            fs::rename(temp_path, &self.final_path).map_err(|e| {
                SinkError::io(
                    format!(
                        "Failed to rename {} -> {}",
                        temp_path.display(),
                        self.final_path.display()
                    ),
                    e,
                )
            })?;
            self.committed = true;
        }
        self.temp_path = None;
        Ok(self.final_path.clone())
    }

    fn rollback(&mut self) {
        if self.committed && self.final_path.exists() {
            let _ = fs::remove_file(&self.final_path);
            warn!("Rolled back committed file: {}", self.final_path.display());
        }
        if let Some(temp_path) = self.temp_path.take() {
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
                warn!("Rolled back temp file: {}", temp_path.display());
            }
        }
        self.committed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Cleanup temp file if we didn't finish properly
        if let Some(temp_path) = &self.temp_path {
            if temp_path.exists() {
                let _ = fs::remove_file(temp_path);
                warn!("Cleaned up orphaned temp file: {}", temp_path.display());
            }
        }
    }
}

/// CSV sink writer
///
/// Writes `{prefix}_{stamp}.csv` with a fixed header.
pub struct CsvSink {
    staged: StagedFile,
    writer: Option<csv::Writer<File>>,
    columns: usize,
    rows_written: u64,
}

impl CsvSink {
    pub fn new(output_dir: &Path, prefix: &str, stamp: &str, header: &[&str]) -> SinkResult<Self> {
        let filename = output_filename(prefix, stamp, "csv");
        let (staged, file) = StagedFile::create(output_dir, &filename)?;
        info!(
            "Initializing CSV sink: {} (temp: {})",
            staged.final_path.display(),
            staged
                .temp_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(header).map_err(|e| SinkError::Csv {
            message: "Failed to write CSV header".to_string(),
            source: e,
        })?;

        Ok(Self {
            staged,
            writer: Some(writer),
            columns: header.len(),
            rows_written: 0,
        })
    }

    pub fn write_row<I, S>(&mut self, row: I) -> SinkResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::message("CSV sink already finished"))?;
        let record: csv::ByteRecord = row.into_iter().collect();
        if record.len() != self.columns {
            return Err(SinkError::message(format!(
                "CSV row has {} fields, header has {}",
                record.len(),
                self.columns
            )));
        }
        writer.write_byte_record(&record).map_err(|e| SinkError::Csv {
            message: "Failed to write CSV row".to_string(),
            source: e,
        })?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn prepare(&mut self) -> SinkResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| SinkError::io("Failed to flush CSV sink", e))?;
        }
        Ok(())
    }
}

/// Line-oriented text sink (change log)
pub struct TextSink {
    staged: StagedFile,
    writer: Option<BufWriter<File>>,
    lines_written: u64,
}

impl TextSink {
    pub fn new(output_dir: &Path, prefix: &str, stamp: &str) -> SinkResult<Self> {
        let filename = output_filename(prefix, stamp, "txt");
        let (staged, file) = StagedFile::create(output_dir, &filename)?;
        debug!("Initializing text sink: {}", staged.final_path.display());
        Ok(Self {
            staged,
            writer: Some(BufWriter::new(file)),
            lines_written: 0,
        })
    }

    pub fn write_line(&mut self, line: &str) -> SinkResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::message("Text sink already finished"))?;
        writeln!(writer, "{}", line).map_err(|e| SinkError::io("Failed to write line", e))?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn prepare(&mut self) -> SinkResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| SinkError::io("Failed to flush text sink", e))?;
        }
        Ok(())
    }
}

enum Sink {
    Csv(Box<CsvSink>),
    Text(TextSink),
}

impl Sink {
    fn prepare(&mut self) -> SinkResult<()> {
        match self {
            Sink::Csv(sink) => sink.prepare(),
            Sink::Text(sink) => sink.prepare(),
        }
    }

    fn staged(&mut self) -> &mut StagedFile {
        match self {
            Sink::Csv(sink) => &mut sink.staged,
            Sink::Text(sink) => &mut sink.staged,
        }
    }
}

/// Sink registry - commits the artifacts of one run together
pub struct SinkRegistry {
    sinks: BTreeMap<String, Sink>,
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self {
            sinks: BTreeMap::new(),
        }
    }

    pub fn add_csv(&mut self, name: &str, sink: CsvSink) {
        self.sinks.insert(name.to_string(), Sink::Csv(Box::new(sink)));
    }

    pub fn add_text(&mut self, name: &str, sink: TextSink) {
        self.sinks.insert(name.to_string(), Sink::Text(sink));
    }

    /// Finish all sinks using prepare/commit with rollback on failure.
    ///
    /// Returns the committed paths keyed by sink name.
    pub fn finish(mut self) -> SinkResult<BTreeMap<String, PathBuf>> {
        let mut failure = None;
        for (name, sink) in self.sinks.iter_mut() {
            debug!("Preparing sink: {}", name);
            if let Err(err) = sink.prepare() {
                failure = Some(err);
                break;
            }
        }
        if let Some(err) = failure {
            self.rollback_all();
            return Err(err);
        }

        let mut committed = BTreeMap::new();
        for (name, sink) in self.sinks.iter_mut() {
            debug!("Committing sink: {}", name);
            match sink.staged().commit() {
                Ok(path) => {
                    committed.insert(name.clone(), path);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            warn!("Sink commit failed, rolling back: {}", err);
            self.rollback_all();
            return Err(err);
        }

        Ok(committed)
    }

    /// Discard every staged artifact.
    pub fn abort(mut self) {
        self.rollback_all();
    }

    fn rollback_all(&mut self) {
        for sink in self.sinks.values_mut() {
            sink.staged().rollback();
        }
    }
}

/// Write raw bytes to `{prefix}_{stamp}.{extension}` via a staged temp file.
pub fn write_archive(
    output_dir: &Path,
    prefix: &str,
    stamp: &str,
    extension: &str,
    bytes: &[u8],
) -> SinkResult<PathBuf> {
    let filename = output_filename(prefix, stamp, extension);
    let (mut staged, mut file) = StagedFile::create(output_dir, &filename)?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| SinkError::io(format!("Failed to write archive {}", filename), e))?;
    drop(file);
    let path = staged.commit()?;
    info!("Archived {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Most recent `{prefix}_*.{extension}` artifact in `dir`, by stamp.
pub fn latest_artifact(dir: &Path, prefix: &str, extension: &str) -> SinkResult<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let head = format!("{}_", prefix);
    let tail = format!(".{}", extension);
    let entries = fs::read_dir(dir)
        .map_err(|e| SinkError::io(format!("Failed to list {}", dir.display()), e))?;

    let latest = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&head) && n.ends_with(&tail))
                .unwrap_or(false)
        })
        .max();
    Ok(latest)
}
