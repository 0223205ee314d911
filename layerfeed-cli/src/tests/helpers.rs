//! Test helpers for composing manifests and layers arguments on disk.

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::OutputFormat;
use layerfeed_core::test_support::StubFeatureSource;
use tempfile::TempDir;

use crate::layers::LayersArgs;

pub(super) const ROAD_SEARCH_NAME: &str = "gov:roads";

const ROADS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "properties": {"name": "Alaska Highway"},
     "geometry": {"type": "LineString", "coordinates": [[-135.05, 60.72], [-135.21, 60.75]]}}
  ]
}"#;

const REGION_MANIFEST: &str = concat!(
    r#"{"region": "Yukon", "layers": ["#,
    r#"{"wfs_layer_name": "Roads", "wfs_layer_search_name": "gov:roads", "#,
    r#""link": "https://data.example.test/geoserver/wfs", "output_format": "GeoJSON", "#,
    r#""version": "2.0.0", "standard_layer_name": "Yukon_Roads"}, "#,
    r#"{"wfs_layer_name": "Hillshade", "wfs_layer_search_name": "base:hillshade", "#,
    r#""link": "https://maps.example.test/wms", "link_type": "wms", "#,
    r#""version": "1.3.0", "standard_layer_name": "Yukon_Hillshade"}"#,
    "]}\n"
);

/// Scratch directory holding a region manifest.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        write_utf8(&root.join("regions.jsonl"), REGION_MANIFEST.as_bytes());
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn manifest(&self) -> Utf8PathBuf {
        self.root.join("regions.jsonl")
    }

    pub(super) fn log_path(&self) -> Utf8PathBuf {
        self.root.join("logs/layerfeed.jsonl")
    }

    /// Arguments naming every required option.
    pub(super) fn complete_args(&self) -> LayersArgs {
        LayersArgs {
            manifest: Some(self.manifest()),
            output_dir: Some(self.root.join("output")),
            log_path: Some(self.log_path()),
            catalog_url: Some("http://localhost:8080/geoserver/rest".to_owned()),
            catalog_username: Some("admin".to_owned()),
            catalog_password: Some("geoserver".to_owned()),
            ..LayersArgs::default()
        }
    }

    pub(super) fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .expect("read outcome log")
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

pub(super) fn stub_source() -> StubFeatureSource {
    StubFeatureSource::default().with_payload(
        ROAD_SEARCH_NAME,
        OutputFormat::GeoJson,
        ROADS_GEOJSON.as_bytes(),
    )
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents).expect("write file");
}
