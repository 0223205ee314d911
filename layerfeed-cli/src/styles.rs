//! `styles` command: upload styles and make them layer defaults.

use camino::Utf8PathBuf;
use clap::Parser;
use layerfeed_core::{Catalog, StyleRunReport, apply_styles};
use layerfeed_data::{CatalogClient, CatalogSettings, JsonlOutcomeLog, read_style_manifest};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::connection::{CatalogEnv, CatalogFlags};
use crate::inputs::require_existing;
use crate::{
    ARG_CATALOG_PASSWORD, ARG_CATALOG_TIMEOUT, ARG_CATALOG_URL, ARG_CATALOG_USERNAME,
    ARG_LOG_PATH, ARG_MANIFEST, CliError, DEFAULT_LOG_PATH, ENV_STYLES_CATALOG_PASSWORD,
    ENV_STYLES_CATALOG_URL, ENV_STYLES_CATALOG_USERNAME, ENV_STYLES_MANIFEST,
};

const STYLES_CATALOG_ENV: CatalogEnv = CatalogEnv {
    url: ENV_STYLES_CATALOG_URL,
    username: ENV_STYLES_CATALOG_USERNAME,
    password: ENV_STYLES_CATALOG_PASSWORD,
};

/// CLI arguments for the `styles` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "styles",
    long_about = "Validate each SLD document named in a style manifest, \
                 create or update the style in its workspace, and make it \
                 the default style of the declared layer.",
    about = "Upload styles from a style manifest"
)]
#[ortho_config(prefix = "LAYERFEED")]
pub(crate) struct StylesArgs {
    /// Path to the JSONL style manifest.
    #[arg(long = ARG_MANIFEST, value_name = "path")]
    #[serde(default)]
    pub(crate) manifest: Option<Utf8PathBuf>,
    /// NDJSON log receiving one entry per style.
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
}

impl StylesArgs {
    pub(crate) fn into_config(self) -> Result<StylesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        StylesConfig::try_from(merged)
    }
}

/// Resolved `styles` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct StylesConfig {
    pub(crate) manifest: Utf8PathBuf,
    pub(crate) log_path: Utf8PathBuf,
    pub(crate) catalog: CatalogSettings,
}

impl TryFrom<StylesArgs> for StylesConfig {
    type Error = CliError;

    fn try_from(args: StylesArgs) -> Result<Self, Self::Error> {
        let manifest = args.manifest.ok_or(CliError::MissingArgument {
            field: ARG_MANIFEST,
            env: ENV_STYLES_MANIFEST,
        })?;
        let catalog = CatalogFlags {
            url: args.catalog_url,
            username: args.catalog_username,
            password: args.catalog_password,
            timeout_secs: args.catalog_timeout_secs,
            ..CatalogFlags::default()
        }
        .into_settings(STYLES_CATALOG_ENV)?;
        Ok(Self {
            manifest,
            log_path: args
                .log_path
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_LOG_PATH)),
            catalog,
        })
    }
}

pub(super) fn run_styles(args: StylesArgs) -> Result<StyleRunReport, CliError> {
    let config = args.into_config()?;
    require_existing(&config.manifest, ARG_MANIFEST)?;
    let catalog =
        CatalogClient::connect(&config.catalog).map_err(|source| CliError::BuildCatalog {
            base_url: config.catalog.base_url.clone(),
            source,
        })?;
    execute_styles(&config, &catalog)
}

/// Apply the configured style manifest through `catalog`.
pub(super) fn execute_styles(
    config: &StylesConfig,
    catalog: &dyn Catalog,
) -> Result<StyleRunReport, CliError> {
    let styles = read_style_manifest(&config.manifest)?;
    let mut log =
        JsonlOutcomeLog::open(&config.log_path).map_err(|source| CliError::OpenOutcomeLog {
            path: config.log_path.clone(),
            source,
        })?;
    let report = apply_styles(catalog, &styles, &mut log)?;
    info!(
        "{} style(s) assigned, {} failed; outcomes appended to {}",
        report.succeeded,
        report.failed,
        log.path()
    );
    Ok(report)
}
