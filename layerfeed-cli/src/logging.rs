//! Subscriber installation for the binary.

use tracing_subscriber::EnvFilter;

use crate::CliError;

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install a formatting subscriber writing to stderr.
///
/// Verbosity follows `RUST_LOG` and defaults to `info`. Records emitted
/// through the `log` facade by the library crates are forwarded to the same
/// subscriber.
///
/// # Errors
///
/// Returns [`CliError::Logging`] when a global subscriber or logger is
/// already installed.
pub fn init_logging() -> Result<(), CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::Logging {
            message: err.to_string(),
        })
}
