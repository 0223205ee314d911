//! Conversion of fetched payloads into uploadable shapefile bundles.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::source::FeaturePayload;

/// Errors raised while converting a payload into a shapefile bundle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// No recognised geometry column was present in tabular input.
    #[error("no geometry column found among {columns:?}")]
    MissingGeometryColumn {
        /// Header row of the input.
        columns: Vec<String>,
    },
    /// Tabular input could not be read.
    #[error("malformed CSV input: {message}")]
    Csv {
        /// Reader diagnostic.
        message: String,
    },
    /// A geometry cell held invalid WKT.
    #[error("row {row}: invalid WKT geometry: {message}")]
    InvalidWkt {
        /// One-based data row.
        row: usize,
        /// Parser diagnostic.
        message: String,
    },
    /// The GeoJSON document could not be read.
    #[error("invalid GeoJSON: {message}")]
    InvalidGeoJson {
        /// Parser diagnostic.
        message: String,
    },
    /// The payload held no features with geometry.
    #[error("payload contains no features with geometry")]
    NoFeatures,
    /// Features mixed geometry families a single shapefile cannot hold.
    #[error("shapefile cannot mix {first} and {second} geometries")]
    MixedGeometry {
        /// Family of the first feature.
        first: &'static str,
        /// Conflicting family.
        second: &'static str,
    },
    /// A geometry kind has no shapefile equivalent.
    #[error("unsupported geometry type {kind}")]
    UnsupportedGeometry {
        /// Geometry kind.
        kind: &'static str,
    },
    /// A geometry had too few vertices to be written.
    #[error("feature {feature}: degenerate {kind}")]
    DegenerateGeometry {
        /// Zero-based feature index.
        feature: usize,
        /// Geometry kind.
        kind: &'static str,
    },
    /// A zipped shapefile lacked a required member.
    #[error("archive does not contain a {extension} member")]
    MissingMember {
        /// Missing extension, such as `.shp`.
        extension: &'static str,
    },
    /// A zip archive could not be read or written.
    #[error("archive error: {message}")]
    Archive {
        /// Archive diagnostic.
        message: String,
    },
    /// The shapefile writer or reader failed.
    #[error("shapefile error: {message}")]
    Shapefile {
        /// Shapefile diagnostic.
        message: String,
    },
    /// Local filesystem access failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

/// Converts fetched payloads into zipped shapefile bundles.
pub trait Normaliser {
    /// Write `<target_dir>/<stem>.zip` from `payload` and return its path.
    ///
    /// The shapefile members inside the archive are named `<stem>.*`, so the
    /// catalog publishes the feature type under `stem`. `target_dir` is
    /// created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the payload cannot be decoded or the
    /// bundle cannot be written.
    fn normalise(
        &self,
        payload: &FeaturePayload,
        target_dir: &Utf8Path,
        stem: &str,
    ) -> Result<Utf8PathBuf, FormatError>;
}
