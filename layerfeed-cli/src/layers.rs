//! `layers` command: reconcile a region manifest against the catalog.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use layerfeed_core::{
    Catalog, FeatureSource, ReconcileSettings, Reconciler, RunReport, WmsStoreOptions,
};
use layerfeed_data::{
    CatalogClient, CatalogSettings, FeatureSourceSettings, HttpFeatureSource, JsonlOutcomeLog,
    ShapefileNormaliser, read_region_manifest,
};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::connection::{CatalogEnv, CatalogFlags};
use crate::inputs::{require_existing, require_output_dir};
use crate::{
    ARG_CATALOG_PASSWORD, ARG_CATALOG_TIMEOUT, ARG_CATALOG_URL, ARG_CATALOG_USERNAME,
    ARG_DELETION_ATTEMPTS, ARG_DELETION_INTERVAL, ARG_LOG_PATH, ARG_MANIFEST, ARG_OUTPUT_DIR,
    ARG_REGIONS, ARG_SOURCE_TIMEOUT, ARG_WMS_CONNECT_TIMEOUT, ARG_WMS_MAX_CONNECTIONS,
    ARG_WMS_PASSWORD, ARG_WMS_READ_TIMEOUT, ARG_WMS_USERNAME, ARG_WORKSPACE_SUFFIX, CliError,
    DEFAULT_LOG_PATH, DEFAULT_OUTPUT_DIR, ENV_LAYERS_CATALOG_PASSWORD, ENV_LAYERS_CATALOG_URL,
    ENV_LAYERS_CATALOG_USERNAME, ENV_LAYERS_MANIFEST,
};

const LAYERS_CATALOG_ENV: CatalogEnv = CatalogEnv {
    url: ENV_LAYERS_CATALOG_URL,
    username: ENV_LAYERS_CATALOG_USERNAME,
    password: ENV_LAYERS_CATALOG_PASSWORD,
};

/// CLI arguments for the `layers` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "layers",
    long_about = "Fetch every layer declared in a region manifest, normalise \
                 vector layers into shapefile bundles, and converge the \
                 catalog's workspaces, datastores and layers onto them. One \
                 NDJSON entry is appended to the log per layer.",
    about = "Reconcile a region manifest against the catalog"
)]
#[ortho_config(prefix = "LAYERFEED")]
pub(crate) struct LayersArgs {
    /// Path to the JSONL region manifest.
    #[arg(long = ARG_MANIFEST, value_name = "path")]
    #[serde(default)]
    pub(crate) manifest: Option<Utf8PathBuf>,
    /// Directory receiving one subdirectory per region.
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// NDJSON log receiving one entry per layer.
    #[arg(long = ARG_LOG_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) log_path: Option<Utf8PathBuf>,
    /// Catalog REST root, e.g. "http://localhost:8080/geoserver/rest".
    #[arg(long = ARG_CATALOG_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) catalog_url: Option<String>,
    /// Catalog user name.
    #[arg(long = ARG_CATALOG_USERNAME, value_name = "name")]
    #[serde(default)]
    pub(crate) catalog_username: Option<String>,
    /// Catalog password. Prefer the environment or a config file.
    #[arg(long = ARG_CATALOG_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) catalog_password: Option<String>,
    /// Catalog request timeout.
    #[arg(long = ARG_CATALOG_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) catalog_timeout_secs: Option<u64>,
    /// Existence checks made while waiting for a deleted datastore to vanish.
    #[arg(long = ARG_DELETION_ATTEMPTS, value_name = "count")]
    #[serde(default)]
    pub(crate) deletion_attempts: Option<u32>,
    /// Pause before each of those checks.
    #[arg(long = ARG_DELETION_INTERVAL, value_name = "ms")]
    #[serde(default)]
    pub(crate) deletion_interval_ms: Option<u64>,
    /// Comma-separated region names to process; every region when unset.
    #[arg(long = ARG_REGIONS, value_name = "names")]
    #[serde(default)]
    pub(crate) regions: Option<String>,
    /// Suffix joined to region names to form workspace names.
    #[arg(long = ARG_WORKSPACE_SUFFIX, value_name = "suffix")]
    #[serde(default)]
    pub(crate) workspace_suffix: Option<String>,
    /// Upstream feature request timeout.
    #[arg(long = ARG_SOURCE_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) source_timeout_secs: Option<u64>,
    /// Pooled connections per cascaded WMS store.
    #[arg(long = ARG_WMS_MAX_CONNECTIONS, value_name = "count")]
    #[serde(default)]
    pub(crate) wms_max_connections: Option<u32>,
    /// Connect timeout for cascaded WMS stores.
    #[arg(long = ARG_WMS_CONNECT_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) wms_connect_timeout_secs: Option<u32>,
    /// Read timeout for cascaded WMS stores.
    #[arg(long = ARG_WMS_READ_TIMEOUT, value_name = "secs")]
    #[serde(default)]
    pub(crate) wms_read_timeout_secs: Option<u32>,
    /// User name the catalog presents to upstream map services.
    #[arg(long = ARG_WMS_USERNAME, value_name = "name")]
    #[serde(default)]
    pub(crate) wms_username: Option<String>,
    /// Password the catalog presents to upstream map services.
    #[arg(long = ARG_WMS_PASSWORD, value_name = "password")]
    #[serde(default)]
    pub(crate) wms_password: Option<String>,
}

impl LayersArgs {
    pub(crate) fn into_config(self) -> Result<LayersConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LayersConfig::try_from(merged)
    }
}

/// Resolved `layers` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct LayersConfig {
    pub(crate) manifest: Utf8PathBuf,
    pub(crate) log_path: Utf8PathBuf,
    pub(crate) catalog: CatalogSettings,
    pub(crate) source: FeatureSourceSettings,
    pub(crate) reconcile: ReconcileSettings,
}

impl LayersConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.manifest, ARG_MANIFEST)?;
        require_output_dir(&self.reconcile.output_dir)
    }
}

impl TryFrom<LayersArgs> for LayersConfig {
    type Error = CliError;

    fn try_from(args: LayersArgs) -> Result<Self, Self::Error> {
        let manifest = args.manifest.ok_or(CliError::MissingArgument {
            field: ARG_MANIFEST,
            env: ENV_LAYERS_MANIFEST,
        })?;
        let catalog = CatalogFlags {
            url: args.catalog_url,
            username: args.catalog_username,
            password: args.catalog_password,
            timeout_secs: args.catalog_timeout_secs,
            deletion_attempts: args.deletion_attempts,
            deletion_interval_ms: args.deletion_interval_ms,
        }
        .into_settings(LAYERS_CATALOG_ENV)?;

        let output_dir = args
            .output_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR));
        let mut reconcile = ReconcileSettings::new(output_dir);
        if let Some(suffix) = args.workspace_suffix {
            reconcile = reconcile.with_workspace_suffix(suffix);
        }
        if let Some(raw) = args.regions {
            reconcile = reconcile.with_regions(parse_regions(&raw)?);
        }
        let defaults = WmsStoreOptions::default();
        reconcile = reconcile.with_wms_options(WmsStoreOptions {
            max_connections: args.wms_max_connections.unwrap_or(defaults.max_connections),
            connect_timeout_secs: args
                .wms_connect_timeout_secs
                .unwrap_or(defaults.connect_timeout_secs),
            read_timeout_secs: args
                .wms_read_timeout_secs
                .unwrap_or(defaults.read_timeout_secs),
            use_connection_pooling: defaults.use_connection_pooling,
            username: args.wms_username,
            password: args.wms_password,
        });

        let mut source = FeatureSourceSettings::default();
        if let Some(secs) = args.source_timeout_secs {
            source = source.with_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            manifest,
            log_path: args
                .log_path
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_LOG_PATH)),
            catalog,
            source,
            reconcile,
        })
    }
}

fn parse_regions(raw: &str) -> Result<Vec<String>, CliError> {
    let regions: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();
    if regions.is_empty() {
        return Err(CliError::InvalidArgument {
            field: ARG_REGIONS,
            reason: "no region names given".to_owned(),
        });
    }
    Ok(regions)
}

pub(super) fn run_layers(args: LayersArgs) -> Result<RunReport, CliError> {
    let config = resolve_layers_config(args)?;
    let catalog =
        CatalogClient::connect(&config.catalog).map_err(|source| CliError::BuildCatalog {
            base_url: config.catalog.base_url.clone(),
            source,
        })?;
    let source =
        HttpFeatureSource::new(config.source.clone()).map_err(CliError::BuildFeatureSource)?;
    execute_layers(&config, &catalog, &source)
}

fn resolve_layers_config(args: LayersArgs) -> Result<LayersConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Reconcile the configured manifest through `catalog` and `source`.
pub(super) fn execute_layers(
    config: &LayersConfig,
    catalog: &dyn Catalog,
    source: &dyn FeatureSource,
) -> Result<RunReport, CliError> {
    let regions = read_region_manifest(&config.manifest)?;
    info!(
        "read {} region(s) from {}",
        regions.len(),
        config.manifest
    );
    let mut log =
        JsonlOutcomeLog::open(&config.log_path).map_err(|source| CliError::OpenOutcomeLog {
            path: config.log_path.clone(),
            source,
        })?;
    let normaliser = ShapefileNormaliser::new();
    let report = Reconciler::new(catalog, source, &normaliser, &config.reconcile)
        .reconcile_manifest(&regions, &mut log)?;

    for region in report.aborted_regions() {
        if let Some(error) = &region.abort {
            warn!("region {} stopped early: {error}", region.region);
        }
    }
    info!(
        "{} layer(s) published, {} failed; outcomes appended to {}",
        report.layers_succeeded(),
        report.layers_failed(),
        log.path()
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LayersConfig, CliError> {
    let merged = LayersArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LayersConfig::try_from(merged)
}
