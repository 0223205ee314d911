//! Client behaviour against the in-memory catalog server.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::{
    Catalog, CatalogError, RenameOutcome, StoreAction, StyleAction, WmsStoreOptions,
    WorkspaceOutcome,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use super::test_support::FakeCatalogServer;
use super::{CatalogClient, DeletionPolicy, Method};

const WS: &str = "Yukon_v2";
const DS: &str = "roads_datastore";
const CAPS: &str = "https://maps.example.test/wms?service=WMS&request=GetCapabilities";

const SLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.0.0" xmlns="http://www.opengis.net/sld">
  <NamedLayer><Name>roads</Name></NamedLayer>
</StyledLayerDescriptor>"#;

struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Scratch {
    /// Write a minimal zipped shapefile whose members are named `<stem>.*`.
    fn bundle(&self, stem: &str) -> Utf8PathBuf {
        let path = self.root.join(format!("{stem}.zip"));
        let file = std::fs::File::create(&path).expect("create bundle");
        let mut writer = zip::ZipWriter::new(file);
        for extension in ["shp", "shx", "dbf"] {
            writer
                .start_file(format!("{stem}.{extension}"), SimpleFileOptions::default())
                .expect("start member");
            writer.write_all(b"stub").expect("write member");
        }
        writer.finish().expect("finish bundle");
        path
    }

    fn style(&self, name: &str, body: &str) -> Utf8PathBuf {
        let path = self.root.join(format!("{name}.sld"));
        std::fs::write(&path, body).expect("write style");
        path
    }
}

#[fixture]
fn scratch() -> Scratch {
    let dir = TempDir::new().expect("tempdir");
    let root = Utf8Path::from_path(dir.path())
        .expect("utf-8 tempdir")
        .to_owned();
    Scratch { _dir: dir, root }
}

fn client(server: FakeCatalogServer) -> CatalogClient<FakeCatalogServer> {
    CatalogClient::new(server).with_deletion_policy(DeletionPolicy {
        max_attempts: 3,
        interval: Duration::ZERO,
    })
}

#[rstest]
fn ensure_workspace_creates_then_reports_existing() {
    let client = client(FakeCatalogServer::default());
    assert_eq!(client.ensure_workspace(WS).expect("create"), WorkspaceOutcome::Created);
    assert_eq!(
        client.ensure_workspace(WS).expect("second call"),
        WorkspaceOutcome::AlreadyExisted
    );
    assert!(client.transport().has_workspace(WS));
    assert!(client.workspace_exists(WS).expect("lookup"));
    assert!(!client.workspace_exists("Other_v2").expect("lookup"));
}

#[rstest]
fn absent_datastore_is_uploaded_once_without_deletion(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_workspace(WS));
    let bundle = scratch.bundle("roads");

    let action = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect("upload");

    assert_eq!(action, StoreAction::Created);
    let server = client.transport();
    assert_eq!(server.count_method(Method::Delete), 0);
    assert_eq!(
        server.count(Method::Put, &format!("workspaces/{WS}/datastores/{DS}/file.shp")),
        1
    );
    assert_eq!(server.feature_types(WS, DS), Some(vec!["roads".to_owned()]));
}

#[rstest]
fn existing_datastore_is_left_alone_when_updates_are_disabled(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_datastore(WS, DS, "Roads"));
    let bundle = scratch.bundle("roads");

    let action = client
        .ensure_vector_datastore(WS, DS, &bundle, false)
        .expect("lookup");

    assert_eq!(action, StoreAction::Skipped);
    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Get);
}

#[rstest]
fn existing_datastore_is_deleted_polled_and_recreated(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "Roads")
        .with_deletion_lag(1);
    let client = client(server);
    let bundle = scratch.bundle("roads");

    let action = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect("replace");

    assert_eq!(action, StoreAction::Replaced);
    let sequence: Vec<(Method, String)> = client
        .transport()
        .requests()
        .into_iter()
        .map(|request| (request.method, request.path))
        .collect();
    let store = format!("workspaces/{WS}/datastores/{DS}");
    assert_eq!(
        sequence,
        vec![
            (Method::Get, store.clone()),
            (Method::Delete, format!("{store}?recurse=true")),
            (Method::Get, store.clone()),
            (Method::Get, store.clone()),
            (Method::Put, format!("{store}/file.shp")),
        ]
    );
    assert_eq!(
        client.transport().feature_types(WS, DS),
        Some(vec!["roads".to_owned()])
    );
}

#[rstest]
fn lingering_datastore_times_out(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "Roads")
        .with_deletion_lag(10);
    let client = client(server);
    let bundle = scratch.bundle("roads");

    let err = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect_err("deletion never completes");

    assert!(matches!(
        err,
        CatalogError::DeletionTimeout { attempts: 3, ref datastore, .. } if datastore == DS
    ));
    assert_eq!(client.transport().count(Method::Put, "workspaces"), 0);
}

#[rstest]
fn zero_attempt_policy_still_checks_once_before_uploading(scratch: Scratch) {
    let client = CatalogClient::new(FakeCatalogServer::default().with_datastore(WS, DS, "roads"))
        .with_deletion_policy(DeletionPolicy {
            max_attempts: 0,
            interval: Duration::ZERO,
        });
    let bundle = scratch.bundle("roads");

    let action = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect("replace");

    assert_eq!(action, StoreAction::Replaced);
    assert_eq!(
        client.transport().feature_types(WS, DS),
        Some(vec!["roads".to_owned()])
    );
}

#[rstest]
fn failed_datastore_deletion_is_surfaced_without_upload(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "roads")
        .failing(Method::Delete, "workspaces/Yukon_v2/datastores", 500);
    let client = client(server);
    let bundle = scratch.bundle("roads");

    let err = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect_err("deletion rejected");

    assert!(matches!(err, CatalogError::Store { status: 500, .. }));
    let server = client.transport();
    assert_eq!(server.count(Method::Delete, "workspaces/Yukon_v2/datastores"), 1);
    assert_eq!(
        server.count(Method::Put, &format!("workspaces/{WS}/datastores/{DS}/file.shp")),
        0
    );
}

#[rstest]
fn rejected_credentials_map_to_unauthorized(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().rejecting_credentials());
    let bundle = scratch.bundle("roads");

    let err = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect_err("401");

    assert!(err.is_unauthorized());
    assert!(client.ensure_workspace(WS).expect_err("401").is_unauthorized());
}

#[rstest]
fn failed_upload_reports_status_and_body(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_workspace(WS)
        .failing(Method::Put, "workspaces/Yukon_v2/datastores", 500);
    let client = client(server);
    let bundle = scratch.bundle("roads");

    let err = client
        .ensure_vector_datastore(WS, DS, &bundle, true)
        .expect_err("upload fails");

    assert!(matches!(err, CatalogError::Store { status: 500, .. }));
}

#[rstest]
fn missing_bundle_is_a_read_error(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_workspace(WS));
    let err = client
        .ensure_vector_datastore(WS, DS, &scratch.root.join("absent.zip"), true)
        .expect_err("bundle missing");
    assert!(matches!(err, CatalogError::ReadBundle { .. }));
}

#[rstest]
#[case("roads", "Roads", RenameOutcome::Renamed)]
#[case("roads", "roads", RenameOutcome::Unchanged)]
#[case("rivers", "Rivers", RenameOutcome::NotFound)]
fn rename_published_layer_outcomes(
    #[case] source: &str,
    #[case] target: &str,
    #[case] expected: RenameOutcome,
) {
    let client = client(FakeCatalogServer::default().with_datastore(WS, DS, "roads"));

    let outcome = client
        .rename_published_layer(WS, DS, source, target)
        .expect("rename");

    assert_eq!(outcome, expected);
    let names = client.transport().feature_types(WS, DS).expect("datastore");
    if expected == RenameOutcome::Renamed {
        assert_eq!(names, vec![target.to_owned()]);
    } else {
        assert_eq!(names, vec!["roads".to_owned()]);
    }
}

#[rstest]
fn unchanged_rename_makes_no_request() {
    let client = client(FakeCatalogServer::default());
    client
        .rename_published_layer(WS, DS, "roads", "roads")
        .expect("no-op");
    assert!(client.transport().requests().is_empty());
}

#[rstest]
fn wms_store_is_created_then_updated() {
    let client = client(FakeCatalogServer::default().with_workspace(WS));
    let options = WmsStoreOptions::default();

    let first = client
        .ensure_wms_datastore(WS, "yukon_wms_1", CAPS, &options, true)
        .expect("create");
    let second = client
        .ensure_wms_datastore(WS, "yukon_wms_1", CAPS, &options, true)
        .expect("update");
    let third = client
        .ensure_wms_datastore(WS, "yukon_wms_1", CAPS, &options, false)
        .expect("skip");

    assert_eq!(
        (first, second, third),
        (StoreAction::Created, StoreAction::Replaced, StoreAction::Skipped)
    );
    assert_eq!(
        client.transport().wms_store_url(WS, "yukon_wms_1").as_deref(),
        Some(CAPS)
    );
}

#[rstest]
fn unreachable_capabilities_surface_as_store_error() {
    let server = FakeCatalogServer::default()
        .with_workspace(WS)
        .with_unreachable_capabilities(CAPS);
    let client = client(server);

    let err = client
        .ensure_wms_datastore(WS, "yukon_wms_1", CAPS, &WmsStoreOptions::default(), true)
        .expect_err("remote WMS unreachable");

    match err {
        CatalogError::Store {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert!(message.contains("Error connecting"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
}

#[rstest]
fn wms_layer_is_replaced_when_updates_are_allowed() {
    let server = FakeCatalogServer::default()
        .with_wms_store(WS, "yukon_wms_1", CAPS)
        .with_wms_layer(WS, "yukon_wms_1", "Hydrography");
    let client = client(server);

    let action = client
        .ensure_wms_layer(WS, "yukon_wms_1", "hydro:lines", "Hydrography", true)
        .expect("replace");

    assert_eq!(action, StoreAction::Replaced);
    let server = client.transport();
    assert_eq!(server.count(Method::Delete, "layers/Yukon_v2:Hydrography"), 1);
    assert_eq!(server.count(Method::Delete, "workspaces/Yukon_v2/wmsstores"), 1);
    assert_eq!(server.count(Method::Post, "workspaces/Yukon_v2/wmsstores"), 1);
    assert!(server.has_wms_layer(WS, "yukon_wms_1", "Hydrography"));
}

#[rstest]
fn failed_published_layer_deletion_still_replaces_wms_layer() {
    let server = FakeCatalogServer::default()
        .with_wms_store(WS, "yukon_wms_1", CAPS)
        .with_wms_layer(WS, "yukon_wms_1", "Hydrography")
        .failing(Method::Delete, "layers/", 500);
    let client = client(server);

    let action = client
        .ensure_wms_layer(WS, "yukon_wms_1", "hydro:lines", "Hydrography", true)
        .expect("replace despite failed delete");

    assert_eq!(action, StoreAction::Replaced);
    let server = client.transport();
    assert_eq!(server.count(Method::Delete, "layers/Yukon_v2:Hydrography"), 1);
    assert_eq!(server.count(Method::Delete, "workspaces/Yukon_v2/wmsstores"), 1);
    assert_eq!(server.count(Method::Post, "workspaces/Yukon_v2/wmsstores"), 1);
    assert!(server.has_wms_layer(WS, "yukon_wms_1", "Hydrography"));
}

#[rstest]
fn wms_layer_creation_and_skip() {
    let client = client(FakeCatalogServer::default().with_wms_store(WS, "yukon_wms_1", CAPS));

    let created = client
        .ensure_wms_layer(WS, "yukon_wms_1", "hydro:lines", "Hydrography", false)
        .expect("create");
    let skipped = client
        .ensure_wms_layer(WS, "yukon_wms_1", "hydro:lines", "Hydrography", false)
        .expect("skip");

    assert_eq!((created, skipped), (StoreAction::Created, StoreAction::Skipped));
    assert_eq!(client.transport().count_method(Method::Delete), 0);
}

#[rstest]
fn malformed_style_is_rejected_before_any_request(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_datastore(WS, DS, "Roads"));
    let path = scratch.style("broken", "<StyledLayerDescriptor><NamedLayer>");

    let err = client
        .upload_style(WS, "Roads", "broken", &path)
        .expect_err("malformed SLD");

    assert!(matches!(err, CatalogError::Validation { .. }));
    assert!(client.transport().requests().is_empty());
}

#[rstest]
fn new_style_is_registered_uploaded_and_assigned(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_datastore(WS, DS, "Roads"));
    let path = scratch.style("roads", SLD);

    let report = client
        .upload_style(WS, "Roads", "roads", &path)
        .expect("upload");

    assert_eq!(report.action, StyleAction::Created);
    assert!(report.assigned());
    let server = client.transport();
    assert_eq!(server.style_body(WS, "roads").as_deref(), Some(SLD));
    assert_eq!(server.default_style(WS, "Roads").as_deref(), Some("roads"));
}

#[rstest]
fn existing_style_body_is_overwritten(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "Roads")
        .with_style(WS, "roads", "<old/>");
    let client = client(server);
    let path = scratch.style("roads", SLD);

    let report = client
        .upload_style(WS, "Roads", "roads", &path)
        .expect("upload");

    assert_eq!(report.action, StyleAction::Updated);
    assert_eq!(client.transport().count(Method::Post, "workspaces/Yukon_v2/styles"), 0);
    assert_eq!(client.transport().style_body(WS, "roads").as_deref(), Some(SLD));
}

#[rstest]
fn style_assignment_to_missing_layer_is_reported_not_raised(scratch: Scratch) {
    let client = client(FakeCatalogServer::default().with_workspace(WS));
    let path = scratch.style("roads", SLD);

    let report = client
        .upload_style(WS, "Missing", "roads", &path)
        .expect("style stored");

    assert_eq!(report.action, StyleAction::Created);
    assert!(!report.assigned());
    assert!(
        report
            .assignment_failure
            .as_deref()
            .is_some_and(|reason| reason.contains("404"))
    );
    assert_eq!(client.transport().style_body(WS, "roads").as_deref(), Some(SLD));
}

#[rstest]
fn style_assignment_rejection_propagates_unauthorized(scratch: Scratch) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "Roads")
        .failing(Method::Put, "layers/", 401);
    let client = client(server);
    let path = scratch.style("roads", SLD);

    let err = client
        .upload_style(WS, "Roads", "roads", &path)
        .expect_err("401 on assignment");

    assert!(err.is_unauthorized());
}

#[rstest]
#[case::registration(Method::Post, "workspaces/Yukon_v2/styles")]
#[case::body_upload(Method::Put, "workspaces/Yukon_v2/styles/")]
fn failed_style_creation_stops_before_assignment(
    scratch: Scratch,
    #[case] method: Method,
    #[case] failing_path: &str,
) {
    let server = FakeCatalogServer::default()
        .with_datastore(WS, DS, "Roads")
        .failing(method, failing_path, 500);
    let client = client(server);
    let path = scratch.style("roads", SLD);

    let err = client
        .upload_style(WS, "Roads", "roads", &path)
        .expect_err("style creation fails");

    assert!(matches!(err, CatalogError::Store { status: 500, .. }));
    let server = client.transport();
    assert_eq!(server.count(Method::Put, "layers/"), 0);
    assert!(server.default_style(WS, "Roads").is_none());
}
