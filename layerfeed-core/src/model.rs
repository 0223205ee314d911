//! Manifest records describing the desired catalog state.
//!
//! Region manifests arrive as one JSON object per line. Field names follow the
//! upstream manifest schema, so the vector-layer fields keep their `wfs_`
//! prefix on the wire even though they also describe WMS layers.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A region and the layers published into its workspace.
///
/// # Examples
///
/// ```
/// use layerfeed_core::{LinkType, RegionManifest};
///
/// let line = r#"{"region": "Yukon", "layers": [{
///     "wfs_layer_name": "Roads",
///     "wfs_layer_search_name": "roads",
///     "link": "https://example.test/wfs",
///     "output_format": "json",
///     "version": "2.0.0",
///     "standard_layer_name": "yukon_roads"
/// }]}"#;
/// let region: RegionManifest = serde_json::from_str(line)?;
/// assert_eq!(region.layers.len(), 1);
/// assert_eq!(region.layers[0].link_type, LinkType::Wfs);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionManifest {
    /// Human-readable region name; the workspace name derives from it.
    pub region: String,
    /// Layers to publish, processed in declaration order.
    #[serde(default)]
    pub layers: Vec<LayerDeclaration>,
}

/// One upstream layer and the name it should be published under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerDeclaration {
    /// Display name used in log entries.
    #[serde(rename = "wfs_layer_name")]
    pub layer_name: String,
    /// Source-native identifier of the layer on the upstream service.
    #[serde(rename = "wfs_layer_search_name")]
    pub search_name: String,
    /// Upstream service endpoint.
    pub link: String,
    /// Protocol spoken by `link`.
    #[serde(default)]
    pub link_type: LinkType,
    /// Encoding requested from a feature service.
    #[serde(default)]
    pub output_format: String,
    /// Protocol version sent to the upstream service.
    #[serde(default = "default_version")]
    pub version: String,
    /// Public name of the published catalog layer.
    pub standard_layer_name: String,
}

fn default_version() -> String {
    String::from("1.0.0")
}

/// Upstream protocol of a layer declaration.
///
/// Matching is case-insensitive and a missing value means WFS. Values outside
/// the known set are kept verbatim so the orchestrator can reject the single
/// layer that carries them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum LinkType {
    /// Web Feature Service: vector data fetched and uploaded as a shapefile.
    #[default]
    Wfs,
    /// Web Map Service: cascaded through a catalog WMS store.
    Wms,
    /// Any other declared protocol.
    Other(String),
}

impl From<String> for LinkType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "WFS" => Self::Wfs,
            "WMS" => Self::Wms,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for LinkType {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<LinkType> for String {
    fn from(value: LinkType) -> Self {
        match value {
            LinkType::Wfs => Self::from("WFS"),
            LinkType::Wms => Self::from("WMS"),
            LinkType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wfs => f.write_str("WFS"),
            Self::Wms => f.write_str("WMS"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A style document to upload and assign to a published layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StyleDeclaration {
    /// Workspace owning both the style and the layer.
    pub workspace: String,
    /// Published layer receiving the style as its default.
    pub layer: String,
    /// Catalog name of the style.
    pub style_name: String,
    /// Local SLD document.
    pub style_path: Utf8PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("WFS", LinkType::Wfs)]
    #[case("wfs", LinkType::Wfs)]
    #[case("", LinkType::Wfs)]
    #[case("Wms", LinkType::Wms)]
    #[case(" wms ", LinkType::Wms)]
    #[case("WCS", LinkType::Other("WCS".to_owned()))]
    fn link_type_parses_case_insensitively(#[case] raw: &str, #[case] expected: LinkType) {
        assert_eq!(LinkType::from(raw), expected);
    }

    #[rstest]
    fn missing_optional_fields_take_defaults() {
        let json = r#"{
            "wfs_layer_name": "Parks",
            "wfs_layer_search_name": "parks",
            "link": "https://example.test/wfs",
            "standard_layer_name": "parks"
        }"#;
        let layer: LayerDeclaration =
            serde_json::from_str(json).expect("declaration should deserialise");
        assert_eq!(layer.link_type, LinkType::Wfs);
        assert_eq!(layer.version, "1.0.0");
        assert!(layer.output_format.is_empty());
    }

    #[rstest]
    fn unknown_link_type_survives_round_trip() {
        let encoded = serde_json::to_string(&LinkType::Other("ArcGIS".to_owned()))
            .expect("link type should serialise");
        assert_eq!(encoded, "\"ArcGIS\"");
    }

    #[rstest]
    fn region_without_layers_deserialises() {
        let region: RegionManifest =
            serde_json::from_str(r#"{"region": "Nunavut"}"#).expect("region should deserialise");
        assert!(region.layers.is_empty());
    }
}
