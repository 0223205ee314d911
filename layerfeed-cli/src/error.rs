//! Error types emitted by the layerfeed CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use layerfeed_core::RunError;
use layerfeed_data::ManifestError;
use layerfeed_data::catalog::TransportBuildError;
use layerfeed_data::wfs::SourceBuildError;
use thiserror::Error;

/// Errors emitted by the layerfeed CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// An option was present but unusable.
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory { path: Utf8PathBuf },
    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {message}")]
    Logging { message: String },
    /// A manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The outcome log could not be opened.
    #[error("failed to open outcome log {path:?}: {source}")]
    OpenOutcomeLog {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The catalog HTTP client could not be built.
    #[error("failed to build catalog client for {base_url:?}: {source}")]
    BuildCatalog {
        base_url: String,
        #[source]
        source: TransportBuildError,
    },
    /// The feature source HTTP client could not be built.
    #[error("failed to build feature source: {0}")]
    BuildFeatureSource(#[source] SourceBuildError),
    /// The run stopped before processing every item.
    #[error(transparent)]
    Run(#[from] RunError),
}
