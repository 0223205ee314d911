//! Deterministic derivation of catalog resource names.
//!
//! Every name the pipeline creates in the catalog passes through
//! [`sanitise_name`], so rerunning the same manifest always resolves the same
//! workspaces and datastores.

use sha2::{Digest, Sha256};

/// Suffix appended to region names to form workspace names.
pub const DEFAULT_WORKSPACE_SUFFIX: &str = "v2";

/// Number of digest bytes used in WMS datastore names (eight hex digits).
const LINK_DIGEST_BYTES: usize = 4;

/// Replace the characters the catalog rejects in resource names.
///
/// Colons, spaces and full stops become underscores. The function is
/// idempotent.
///
/// # Examples
///
/// ```
/// use layerfeed_core::sanitise_name;
///
/// assert_eq!(sanitise_name("topp:roads v1.2"), "topp_roads_v1_2");
/// ```
#[must_use]
pub fn sanitise_name(raw: &str) -> String {
    raw.chars()
        .map(|ch| if matches!(ch, ':' | ' ' | '.') { '_' } else { ch })
        .collect()
}

/// Workspace name for a region.
///
/// An empty `suffix` yields the sanitised region name on its own.
#[must_use]
pub fn workspace_name(region: &str, suffix: &str) -> String {
    let base = sanitise_name(region);
    if suffix.is_empty() {
        base
    } else {
        format!("{base}_{}", sanitise_name(suffix))
    }
}

/// Datastore name for a vector layer identified by `search_name`.
#[must_use]
pub fn vector_datastore_name(search_name: &str) -> String {
    format!("{}_datastore", sanitise_name(search_name))
}

/// Datastore name for the WMS endpoint at `link` within `region`.
///
/// The suffix is a SHA-256 prefix of the link, stable across processes.
///
/// # Examples
///
/// ```
/// use layerfeed_core::wms_datastore_name;
///
/// let name = wms_datastore_name("British Columbia", "https://maps.example.test/wms");
/// assert!(name.starts_with("british_columbia_wms_"));
/// assert_eq!(name.len(), "british_columbia_wms_".len() + 8);
/// ```
#[must_use]
pub fn wms_datastore_name(region: &str, link: &str) -> String {
    format!(
        "{}_wms_{}",
        sanitise_name(region).to_lowercase(),
        link_digest(link)
    )
}

fn link_digest(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    hex::encode(
        digest
            .as_slice()
            .get(..LINK_DIGEST_BYTES)
            .unwrap_or_default(),
    )
}
