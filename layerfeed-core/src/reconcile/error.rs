//! Error types produced by the reconciliation orchestrator.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::normalise::FormatError;
use crate::outcome::RecordOutcomeError;
use crate::source::FetchError;

/// Failure confined to a single layer; the region carries on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayerError {
    /// Downloading the upstream layer failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// The download could not be normalised.
    #[error("normalisation failed: {0}")]
    Format(#[from] FormatError),
    /// A catalog operation failed.
    #[error("catalog operation failed: {0}")]
    Catalog(#[source] CatalogError),
    /// The declaration named a protocol the pipeline does not handle.
    #[error("unsupported link type {link_type:?}")]
    UnsupportedLinkType {
        /// Link type as declared.
        link_type: String,
    },
}

/// Failure that stops processing of the current region.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegionError {
    /// The catalog rejected the credentials shared by every region.
    #[error("catalog credentials rejected: {source}")]
    Unauthorized {
        /// Originating catalog error.
        source: CatalogError,
    },
    /// The region's workspace could not be looked up or created.
    #[error("workspace {workspace} unavailable: {source}")]
    Workspace {
        /// Derived workspace name.
        workspace: String,
        /// Originating catalog error.
        source: CatalogError,
    },
}

/// Outcome classification for one layer.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Logged against the layer; processing continues.
    #[error(transparent)]
    Recoverable(LayerError),
    /// Logged against the layer, then the region stops.
    #[error(transparent)]
    Fatal(RegionError),
}

impl From<LayerError> for ReconcileError {
    fn from(error: LayerError) -> Self {
        Self::Recoverable(error)
    }
}

impl From<FetchError> for ReconcileError {
    fn from(error: FetchError) -> Self {
        Self::Recoverable(LayerError::Fetch(error))
    }
}

impl From<FormatError> for ReconcileError {
    fn from(error: FormatError) -> Self {
        Self::Recoverable(LayerError::Format(error))
    }
}

impl From<CatalogError> for ReconcileError {
    fn from(error: CatalogError) -> Self {
        if error.is_unauthorized() {
            Self::Fatal(RegionError::Unauthorized { source: error })
        } else {
            Self::Recoverable(LayerError::Catalog(error))
        }
    }
}

/// Failure that stops the whole run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The catalog rejected the credentials.
    #[error("run aborted in {context}: {source}")]
    Unauthorized {
        /// Region or style record being processed.
        context: String,
        /// Originating catalog error.
        source: CatalogError,
    },
    /// A log entry could not be written.
    #[error(transparent)]
    Sink(#[from] RecordOutcomeError),
}
