//! Command-line interface for the layerfeed catalog pipeline.
//!
//! `layerfeed layers` reconciles a region manifest against the catalog and
//! `layerfeed styles` uploads the styles named in a style manifest. Both
//! append their outcomes to an NDJSON log.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod connection;
mod error;
mod inputs;
mod layers;
mod logging;
mod styles;

pub use error::CliError;
pub use logging::init_logging;

use layers::LayersArgs;
use styles::StylesArgs;

const ARG_MANIFEST: &str = "manifest";
const ARG_OUTPUT_DIR: &str = "output-dir";
const ARG_LOG_PATH: &str = "log-path";
const ARG_CATALOG_URL: &str = "catalog-url";
const ARG_CATALOG_USERNAME: &str = "catalog-username";
const ARG_CATALOG_PASSWORD: &str = "catalog-password";
const ARG_CATALOG_TIMEOUT: &str = "catalog-timeout-secs";
const ARG_DELETION_ATTEMPTS: &str = "deletion-attempts";
const ARG_DELETION_INTERVAL: &str = "deletion-interval-ms";
const ARG_REGIONS: &str = "regions";
const ARG_WORKSPACE_SUFFIX: &str = "workspace-suffix";
const ARG_SOURCE_TIMEOUT: &str = "source-timeout-secs";
const ARG_WMS_MAX_CONNECTIONS: &str = "wms-max-connections";
const ARG_WMS_CONNECT_TIMEOUT: &str = "wms-connect-timeout-secs";
const ARG_WMS_READ_TIMEOUT: &str = "wms-read-timeout-secs";
const ARG_WMS_USERNAME: &str = "wms-username";
const ARG_WMS_PASSWORD: &str = "wms-password";

const ENV_LAYERS_MANIFEST: &str = "LAYERFEED_CMDS_LAYERS_MANIFEST";
const ENV_LAYERS_CATALOG_URL: &str = "LAYERFEED_CMDS_LAYERS_CATALOG_URL";
const ENV_LAYERS_CATALOG_USERNAME: &str = "LAYERFEED_CMDS_LAYERS_CATALOG_USERNAME";
const ENV_LAYERS_CATALOG_PASSWORD: &str = "LAYERFEED_CMDS_LAYERS_CATALOG_PASSWORD";
const ENV_STYLES_MANIFEST: &str = "LAYERFEED_CMDS_STYLES_MANIFEST";
const ENV_STYLES_CATALOG_URL: &str = "LAYERFEED_CMDS_STYLES_CATALOG_URL";
const ENV_STYLES_CATALOG_USERNAME: &str = "LAYERFEED_CMDS_STYLES_CATALOG_USERNAME";
const ENV_STYLES_CATALOG_PASSWORD: &str = "LAYERFEED_CMDS_STYLES_CATALOG_PASSWORD";

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_LOG_PATH: &str = "layerfeed_log.jsonl";

/// Run the layerfeed CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, inputs
/// cannot be read, or the run is aborted. Per-layer and per-style failures
/// are written to the outcome log and do not produce an error.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Layers(args) => {
            layers::run_layers(args)?;
        }
        Command::Styles(args) => {
            styles::run_styles(args)?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "layerfeed",
    about = "Publish upstream WFS and WMS layers into a GeoServer catalog",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile every layer in a region manifest.
    Layers(LayersArgs),
    /// Upload and assign the styles in a style manifest.
    Styles(StylesArgs),
}

#[cfg(test)]
mod tests;
