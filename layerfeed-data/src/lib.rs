//! Adapters connecting the layerfeed pipeline to the outside world.
//!
//! Responsibilities:
//! - Speak the GeoServer REST dialect for the catalog ([`catalog`]).
//! - Fetch layers from OGC web services ([`wfs`]).
//! - Turn fetched payloads into zipped shapefiles ([`normalise`]).
//! - Read JSONL manifests and append NDJSON outcome logs.
//!
//! Boundaries:
//! - Reconciliation rules live in `layerfeed-core`; this crate only
//!   implements its traits.
//! - Every adapter is synchronous; HTTP adapters drive an owned Tokio
//!   runtime internally.
//!
//! Invariants:
//! - No global mutable state. Credentials and endpoints arrive through
//!   explicit settings values.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod manifest;
pub mod normalise;
pub mod outcome_log;
mod runtime;
pub mod wfs;

pub use catalog::{CatalogClient, CatalogSettings, DeletionPolicy, HttpCatalogTransport};
pub use manifest::{ManifestError, read_region_manifest, read_style_manifest};
pub use normalise::ShapefileNormaliser;
pub use outcome_log::JsonlOutcomeLog;
pub use wfs::{FeatureSourceSettings, HttpFeatureSource};
