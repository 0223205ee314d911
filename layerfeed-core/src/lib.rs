//! Core domain types for the layerfeed catalog pipeline.
//!
//! The crate declares the manifest model, the name derivation rules, and the
//! traits through which the reconciliation orchestrator talks to the outside
//! world: a [`Catalog`] that converges remote catalog state, a
//! [`FeatureSource`] that fetches upstream layers, a [`Normaliser`] that turns
//! fetched payloads into shapefile bundles, and an [`OutcomeSink`] that
//! records one log entry per processed layer.
//!
//! Adapters for those traits live in `layerfeed-data`; this crate performs
//! no I/O of its own so the orchestrator can be driven entirely by in-memory
//! doubles.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod naming;
pub mod normalise;
pub mod outcome;
pub mod reconcile;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{
    Catalog, CatalogError, RenameOutcome, StoreAction, StyleAction, StyleReport,
    WmsStoreOptions, WorkspaceOutcome,
};
pub use model::{LayerDeclaration, LinkType, RegionManifest, StyleDeclaration};
pub use naming::{
    DEFAULT_WORKSPACE_SUFFIX, sanitise_name, vector_datastore_name, wms_datastore_name,
    workspace_name,
};
pub use normalise::{FormatError, Normaliser};
pub use outcome::{
    LayerLogEntry, LogStatus, OutcomeSink, RecordOutcomeError, StyleLogEntry,
};
pub use reconcile::{
    LayerError, ReconcileError, ReconcileSettings, Reconciler, RegionError, RegionReport,
    RunError, RunReport, StyleRunReport, apply_styles,
};
pub use source::{FeaturePayload, FeatureRequest, FeatureSource, FetchError, OutputFormat};
