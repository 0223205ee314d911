//! Unit tests for the styles command.

use super::helpers::write_utf8;
use super::*;
use crate::styles::{StylesArgs, StylesConfig, execute_styles};
use camino::Utf8PathBuf;
use layerfeed_data::CatalogClient;
use layerfeed_data::catalog::test_support::FakeCatalogServer;
use rstest::rstest;
use tempfile::TempDir;

const SLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.0.0" xmlns="http://www.opengis.net/sld">
  <NamedLayer><Name>roads</Name></NamedLayer>
</StyledLayerDescriptor>
"#;

fn scratch() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 tempdir");
    (tmp, root)
}

#[rstest]
fn converting_styles_without_manifest_errors() {
    let args = StylesArgs {
        catalog_url: Some("http://localhost:8080/geoserver/rest".to_owned()),
        catalog_username: Some("admin".to_owned()),
        catalog_password: Some("geoserver".to_owned()),
        ..StylesArgs::default()
    };

    let err = StylesConfig::try_from(args).expect_err("missing manifest should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_MANIFEST);
            assert_eq!(env, ENV_STYLES_MANIFEST);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn styles_report_the_styles_env_names() {
    let args = StylesArgs {
        manifest: Some(Utf8PathBuf::from("styles.jsonl")),
        ..StylesArgs::default()
    };

    let err = StylesConfig::try_from(args).expect_err("missing url should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_CATALOG_URL);
            assert_eq!(env, ENV_STYLES_CATALOG_URL);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn execute_styles_uploads_and_logs_each_style() {
    let (_tmp, root) = scratch();
    let sld_path = root.join("styles/roads.sld");
    let broken_path = root.join("styles/broken.sld");
    write_utf8(&sld_path, SLD.as_bytes());
    write_utf8(&broken_path, b"<StyledLayerDescriptor><NamedLayer>");
    let manifest = root.join("styles.jsonl");
    let lines = [
        serde_json::json!({
            "workspace": "Yukon_v2",
            "layer": "Yukon_Roads",
            "style_name": "yukon_roads",
            "style_path": sld_path.as_str(),
        }),
        serde_json::json!({
            "workspace": "Yukon_v2",
            "layer": "Yukon_Roads",
            "style_name": "broken",
            "style_path": broken_path.as_str(),
        }),
    ]
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n");
    write_utf8(&manifest, lines.as_bytes());

    let config = StylesConfig::try_from(StylesArgs {
        manifest: Some(manifest),
        log_path: Some(root.join("styles.log.jsonl")),
        catalog_url: Some("http://localhost:8080/geoserver/rest".to_owned()),
        catalog_username: Some("admin".to_owned()),
        catalog_password: Some("geoserver".to_owned()),
        ..StylesArgs::default()
    })
    .expect("config should build");
    let catalog = CatalogClient::new(
        FakeCatalogServer::default().with_datastore("Yukon_v2", "gov_roads_datastore", "Yukon_Roads"),
    );

    let report = execute_styles(&config, &catalog).expect("style run should complete");

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let server = catalog.transport();
    assert_eq!(
        server.default_style("Yukon_v2", "Yukon_Roads").as_deref(),
        Some("yukon_roads")
    );
    assert!(server.style_body("Yukon_v2", "broken").is_none());

    let log = std::fs::read_to_string(root.join("styles.log.jsonl")).expect("read log");
    assert_eq!(log.lines().count(), 2);
}
