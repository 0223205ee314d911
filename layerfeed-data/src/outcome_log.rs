//! Append-only NDJSON log of run outcomes.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::{LayerLogEntry, OutcomeSink, RecordOutcomeError, StyleLogEntry};
use serde::Serialize;

/// [`OutcomeSink`] appending one JSON object per line to a file.
///
/// Every entry is flushed as soon as it is written so an interrupted run
/// keeps the entries of the items it finished.
#[derive(Debug)]
pub struct JsonlOutcomeLog {
    writer: BufWriter<File>,
    location: Utf8PathBuf,
}

impl JsonlOutcomeLog {
    /// Open (or create) the log at `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the parent directory or file cannot be created.
    pub fn open(path: &Utf8Path) -> io::Result<Self> {
        let file = layerfeed_fs::open_append(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            location: path.to_owned(),
        })
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.location
    }

    fn append(&mut self, what: &str, entry: &impl Serialize) -> Result<(), RecordOutcomeError> {
        serde_json::to_writer(&mut self.writer, entry)
            .map_err(|err| RecordOutcomeError::new(format!("serialise {what}"), err))?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|err| {
                RecordOutcomeError::new(format!("append {what} to {}", self.location), err)
            })
    }
}

impl OutcomeSink for JsonlOutcomeLog {
    fn record_layer(&mut self, entry: &LayerLogEntry) -> Result<(), RecordOutcomeError> {
        self.append("layer entry", entry)
    }

    fn record_style(&mut self, entry: &StyleLogEntry) -> Result<(), RecordOutcomeError> {
        self.append("style entry", entry)
    }
}
