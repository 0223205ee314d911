#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! End-to-end reconciliation against the in-memory catalog server.
//!
//! The real catalog client, shapefile normaliser and NDJSON log are wired
//! together; only the catalog wire and the upstream feature service are
//! simulated.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::test_support::StubFeatureSource;
use layerfeed_core::{
    LayerDeclaration, LayerLogEntry, LinkType, LogStatus, OutputFormat, ReconcileSettings,
    Reconciler, RegionManifest, vector_datastore_name,
};
use layerfeed_data::catalog::test_support::FakeCatalogServer;
use layerfeed_data::catalog::{CatalogClient, DeletionPolicy, Method};
use layerfeed_data::{JsonlOutcomeLog, ShapefileNormaliser};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const WORKSPACE: &str = "Yukon_v2";
const ROAD_SEARCH_NAME: &str = "gov:roads";
const MAP_LINK: &str = "https://maps.example.test/wms?service=WMS";

struct ReconcileWorld {
    _dir: TempDir,
    root: Utf8PathBuf,
    client: RefCell<Option<CatalogClient<FakeCatalogServer>>>,
    regions: RefCell<Vec<RegionManifest>>,
}

impl ReconcileWorld {
    fn log_path(&self) -> Utf8PathBuf {
        self.root.join("logs/layerfeed.jsonl")
    }

    fn entries(&self) -> Vec<LayerLogEntry> {
        fs::read_to_string(self.log_path())
            .expect("log should exist")
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line should be JSON"))
            .collect()
    }

    fn reconcile(&self) {
        let client = self.client.borrow();
        let client = client.as_ref().expect("catalog server should be configured");
        let roads = fs::read(fixture_path("roads.geojson")).expect("fixture should exist");
        let source = StubFeatureSource::default()
            .with_payload(ROAD_SEARCH_NAME, OutputFormat::GeoJson, &roads);
        let normaliser = ShapefileNormaliser::new();
        let settings = ReconcileSettings::new(self.root.join("output"));
        let mut log = JsonlOutcomeLog::open(&self.log_path()).expect("log should open");

        Reconciler::new(client, &source, &normaliser, &settings)
            .reconcile_manifest(&self.regions.borrow(), &mut log)
            .expect("run should complete");
    }
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn road_layer() -> LayerDeclaration {
    LayerDeclaration {
        layer_name: "Roads".to_owned(),
        search_name: ROAD_SEARCH_NAME.to_owned(),
        link: "https://data.example.test/geoserver/wfs".to_owned(),
        link_type: LinkType::Wfs,
        output_format: "GeoJSON".to_owned(),
        version: "2.0.0".to_owned(),
        standard_layer_name: "Yukon_Roads".to_owned(),
    }
}

fn map_layer() -> LayerDeclaration {
    LayerDeclaration {
        layer_name: "Hillshade".to_owned(),
        search_name: "base:hillshade".to_owned(),
        link: MAP_LINK.to_owned(),
        link_type: LinkType::Wms,
        output_format: String::new(),
        version: "1.3.0".to_owned(),
        standard_layer_name: "Yukon_Hillshade".to_owned(),
    }
}

fn server_client(server: FakeCatalogServer) -> CatalogClient<FakeCatalogServer> {
    CatalogClient::new(server).with_deletion_policy(DeletionPolicy {
        max_attempts: 5,
        interval: Duration::ZERO,
    })
}

#[fixture]
fn world() -> ReconcileWorld {
    let dir = TempDir::new().expect("tempdir");
    let root = Utf8Path::from_path(dir.path())
        .expect("utf-8 tempdir")
        .to_owned();
    ReconcileWorld {
        _dir: dir,
        root,
        client: RefCell::new(None),
        regions: RefCell::new(Vec::new()),
    }
}

// --- Given steps ---

#[given("an empty catalog server")]
fn given_empty_server(world: &ReconcileWorld) {
    world
        .client
        .replace(Some(server_client(FakeCatalogServer::default().with_deletion_lag(1))));
}

#[given("a catalog server that cannot reach the map service")]
fn given_unreachable_map_service(world: &ReconcileWorld) {
    world.client.replace(Some(server_client(
        FakeCatalogServer::default().with_unreachable_capabilities(MAP_LINK),
    )));
}

#[given("a manifest with one GeoJSON road layer")]
fn given_road_manifest(world: &ReconcileWorld) {
    world.regions.replace(vec![RegionManifest {
        region: "Yukon".to_owned(),
        layers: vec![road_layer()],
    }]);
}

#[given("a manifest with a map layer followed by the road layer")]
fn given_mixed_manifest(world: &ReconcileWorld) {
    world.regions.replace(vec![RegionManifest {
        region: "Yukon".to_owned(),
        layers: vec![map_layer(), road_layer()],
    }]);
}

// --- When steps ---

#[when("the manifest is reconciled")]
fn when_reconciled(world: &ReconcileWorld) {
    world.reconcile();
}

#[when("the manifest is reconciled again")]
fn when_reconciled_again(world: &ReconcileWorld) {
    world.reconcile();
}

// --- Then steps ---

#[then("the workspace {name} exists")]
fn then_workspace_exists(world: &ReconcileWorld, name: String) {
    let client = world.client.borrow();
    let server = client.as_ref().expect("client").transport();
    assert!(server.has_workspace(name.trim_matches('"')));
}

#[then("the road layer is published as {name}")]
fn then_road_published(world: &ReconcileWorld, name: String) {
    let client = world.client.borrow();
    let server = client.as_ref().expect("client").transport();
    let datastore = vector_datastore_name(ROAD_SEARCH_NAME);
    assert_eq!(
        server.feature_types(WORKSPACE, &datastore),
        Some(vec![name.trim_matches('"').to_owned()])
    );
}

#[then("the last log entry records a created datastore")]
fn then_created_entry(world: &ReconcileWorld) {
    let entries = world.entries();
    let entry = entries.last().expect("an entry should be logged");
    assert_eq!(entry.status, LogStatus::Success, "{}", entry.message);
    assert!(entry.workspace_created);
    assert!(entry.layer_stream_fetched);
    assert!(entry.layer_processed);
    assert!(entry.wfs_datastore_created);
    assert!(!entry.wfs_datastore_updated);
}

#[then("the datastore was deleted before being recreated")]
fn then_deleted_then_recreated(world: &ReconcileWorld) {
    let client = world.client.borrow();
    let server = client.as_ref().expect("client").transport();
    let store = format!(
        "workspaces/{WORKSPACE}/datastores/{}",
        vector_datastore_name(ROAD_SEARCH_NAME)
    );
    let calls: Vec<(Method, String)> = server
        .requests()
        .into_iter()
        .filter(|request| request.path.starts_with(&store))
        .filter(|request| matches!(request.method, Method::Delete | Method::Put))
        .filter(|request| !request.path.contains("/featuretypes/"))
        .map(|request| (request.method, request.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            (Method::Put, format!("{store}/file.shp")),
            (Method::Delete, format!("{store}?recurse=true")),
            (Method::Put, format!("{store}/file.shp")),
        ]
    );
}

#[then("the last log entry records an updated datastore")]
fn then_updated_entry(world: &ReconcileWorld) {
    let entries = world.entries();
    assert_eq!(entries.len(), 2);
    let entry = entries.last().expect("an entry should be logged");
    assert_eq!(entry.status, LogStatus::Success, "{}", entry.message);
    assert!(!entry.workspace_created);
    assert!(entry.wfs_datastore_updated);
    assert!(entry.wfs_layer_updated);
    assert!(!entry.wfs_datastore_created);
}

#[then("the map layer entry reports a store error")]
fn then_map_error(world: &ReconcileWorld) {
    let entries = world.entries();
    assert_eq!(entries.len(), 2);
    let map_entry = &entries[0];
    assert_eq!(map_entry.status, LogStatus::Error);
    assert!(
        map_entry.message.contains("status 500"),
        "message: {}",
        map_entry.message
    );
    assert!(!map_entry.wms_datastore_created);
    assert_eq!(entries[1].status, LogStatus::Success);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/features/catalog_reconciliation.feature");
    let contents = match fs::read_to_string(&feature_path) {
        Ok(data) => data,
        Err(err) => panic!("failed to read feature file {feature_path:?}: {err}"),
    };
    let titles: Vec<String> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .map(str::to_owned)
        .collect();
    let expected = [
        "a fresh workspace receives a GeoJSON vector layer",
        "a rerun replaces the existing datastore",
        "unreachable map capabilities do not stop the region",
    ];
    assert_eq!(titles, expected);
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/catalog_reconciliation.feature", index = $index)]
        fn $name(world: ReconcileWorld) {
            let _ = world;
        }
    };
}

register_scenario!(fresh_workspace_receives_vector_layer, 0);
register_scenario!(rerun_replaces_datastore, 1);
register_scenario!(unreachable_map_capabilities_continue, 2);
