//! Behaviour-driven step definitions driving the layers command scenarios.

use super::helpers::{Workspace, stub_source};
use super::*;
use crate::layers::{LayersArgs, LayersConfig, execute_layers};
use layerfeed_core::test_support::StubCatalog;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Aggregates layers command scenario state behind a single world argument.
struct LayersWorld {
    workspace: Workspace,
    args: RefCell<LayersArgs>,
    config_result: RefCell<Option<Result<LayersConfig, CliError>>>,
    catalog: StubCatalog,
}

impl LayersWorld {
    fn new() -> Self {
        let workspace = Workspace::new();
        Self {
            args: RefCell::new(LayersArgs::default()),
            workspace,
            config_result: RefCell::new(None),
            catalog: StubCatalog::default(),
        }
    }
}

#[fixture]
fn world() -> LayersWorld {
    LayersWorld::new()
}

#[given("a region manifest on disk")]
fn manifest_exists(#[from(world)] world: &LayersWorld) {
    assert!(
        world.workspace.manifest().is_file(),
        "expected the region manifest to exist on disk",
    );
}

#[given("the catalog URL is not configured")]
fn catalog_url_missing(#[from(world)] world: &LayersWorld) {
    let mut args = world.workspace.complete_args();
    args.catalog_url = None;
    world.args.replace(args);
}

#[given("a complete layers configuration")]
fn complete_configuration(#[from(world)] world: &LayersWorld) {
    world.args.replace(world.workspace.complete_args());
}

#[when("the layers configuration is resolved")]
fn resolve_configuration(#[from(world)] world: &LayersWorld) {
    let args = world.args.borrow().clone();
    world.config_result.replace(Some(LayersConfig::try_from(args)));
}

#[when("the layers command runs against the stub catalog")]
fn run_against_stub(#[from(world)] world: &LayersWorld) {
    let args = world.args.borrow().clone();
    let config = LayersConfig::try_from(args).expect("config should build");
    execute_layers(&config, &world.catalog, &stub_source()).expect("run should complete");
}

#[then("configuration fails naming {field}")]
fn configuration_fails(#[from(world)] world: &LayersWorld, field: String) {
    let expected = field.trim_matches('"');
    let result = world.config_result.borrow_mut().take();
    match result {
        Some(Err(CliError::MissingArgument { field: missing, .. })) => {
            assert_eq!(missing, expected);
        }
        Some(Err(other)) => panic!("expected MissingArgument, found {other:?}"),
        Some(Ok(_)) => panic!("expected configuration to fail"),
        None => panic!("configuration was not resolved"),
    }
}

#[then("the outcome log holds {count} entries")]
fn log_holds_entries(#[from(world)] world: &LayersWorld, count: usize) {
    assert_eq!(world.workspace.log_lines().len(), count);
}

#[then("the workspace {name} was created")]
fn workspace_created(#[from(world)] world: &LayersWorld, name: String) {
    assert!(world.catalog.has_workspace(name.trim_matches('"')));
}

macro_rules! register_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/layers_command.feature", name = $scenario_title)]
        fn $fn_name(world: LayersWorld) {
            let _ = world;
        }
    };
}

register_scenario!(missing_catalog_url, "missing catalog URL is reported");
register_scenario!(
    manifest_run_appends_entries,
    "a manifest run appends one entry per layer"
);
