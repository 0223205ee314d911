//! Facade crate for the layerfeed catalog pipeline.
//!
//! This crate re-exports the domain model, the reconciliation orchestrator
//! and its collaborator traits. The HTTP, shapefile and NDJSON adapters are
//! exposed behind the `http` feature, which is enabled by default.

#![forbid(unsafe_code)]

pub use layerfeed_core::{
    Catalog, CatalogError, FeaturePayload, FeatureRequest, FeatureSource, FetchError,
    FormatError, LayerDeclaration, LayerLogEntry, LinkType, LogStatus, Normaliser, OutcomeSink,
    OutputFormat, ReconcileSettings, Reconciler, RegionManifest, RunError, RunReport,
    StoreAction, StyleDeclaration, StyleLogEntry, StyleRunReport, WmsStoreOptions,
    apply_styles, sanitise_name,
};

#[cfg(feature = "http")]
pub use layerfeed_data::{
    CatalogClient, CatalogSettings, DeletionPolicy, FeatureSourceSettings, HttpCatalogTransport,
    HttpFeatureSource, JsonlOutcomeLog, ManifestError, ShapefileNormaliser, read_region_manifest,
    read_style_manifest,
};
