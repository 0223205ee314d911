//! Line-delimited JSON manifests.
//!
//! Region manifests hold one [`RegionManifest`] per line and style manifests
//! one [`StyleDeclaration`] per line. Blank lines are ignored; the first
//! malformed line aborts the read and is reported by its one-based number.

use std::io::{self, BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::{RegionManifest, StyleDeclaration};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while reading a manifest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The manifest file could not be opened.
    #[error("failed to open manifest {path}: {source}")]
    Open {
        /// Manifest location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A line could not be read.
    #[error("failed to read line {line} of {path}: {source}")]
    Read {
        /// Manifest location.
        path: Utf8PathBuf,
        /// One-based line number.
        line: usize,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A line was not a valid record.
    #[error("invalid record on line {line} of {path}: {source}")]
    Parse {
        /// Manifest location.
        path: Utf8PathBuf,
        /// One-based line number.
        line: usize,
        /// Decoder failure.
        source: serde_json::Error,
    },
}

/// Read every region from the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError`] if the file cannot be read or a line is not a
/// valid region record.
pub fn read_region_manifest(path: &Utf8Path) -> Result<Vec<RegionManifest>, ManifestError> {
    read_records(path)
}

/// Read every style declaration from the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError`] if the file cannot be read or a line is not a
/// valid style record.
pub fn read_style_manifest(path: &Utf8Path) -> Result<Vec<StyleDeclaration>, ManifestError> {
    read_records(path)
}

fn read_records<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, ManifestError> {
    let file = layerfeed_fs::open_utf8_file(path).map_err(|source| ManifestError::Open {
        path: path.to_owned(),
        source,
    })?;
    parse_lines(BufReader::new(file.into_std()), path)
}

fn parse_lines<T: DeserializeOwned>(
    reader: impl BufRead,
    path: &Utf8Path,
) -> Result<Vec<T>, ManifestError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|source| ManifestError::Read {
            path: path.to_owned(),
            line: number,
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| ManifestError::Parse {
            path: path.to_owned(),
            line: number,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
