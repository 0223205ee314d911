//! Catalog connection options shared by every subcommand.

use std::time::Duration;

use layerfeed_data::{CatalogSettings, DeletionPolicy};

use crate::{
    ARG_CATALOG_PASSWORD, ARG_CATALOG_URL, ARG_CATALOG_USERNAME, ARG_DELETION_ATTEMPTS, CliError,
};

/// Environment variables naming each required connection option for one
/// subcommand.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CatalogEnv {
    pub(crate) url: &'static str,
    pub(crate) username: &'static str,
    pub(crate) password: &'static str,
}

/// Connection options after configuration merging.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogFlags {
    pub(crate) url: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) deletion_attempts: Option<u32>,
    pub(crate) deletion_interval_ms: Option<u64>,
}

impl CatalogFlags {
    /// Build settings, failing on the first missing required option.
    pub(crate) fn into_settings(self, env: CatalogEnv) -> Result<CatalogSettings, CliError> {
        let url = self.url.ok_or(CliError::MissingArgument {
            field: ARG_CATALOG_URL,
            env: env.url,
        })?;
        let username = self.username.ok_or(CliError::MissingArgument {
            field: ARG_CATALOG_USERNAME,
            env: env.username,
        })?;
        let password = self.password.ok_or(CliError::MissingArgument {
            field: ARG_CATALOG_PASSWORD,
            env: env.password,
        })?;

        let mut settings = CatalogSettings::new(url, username, password);
        if let Some(secs) = self.timeout_secs {
            settings = settings.with_timeout(Duration::from_secs(secs));
        }
        let defaults = DeletionPolicy::default();
        let max_attempts = self.deletion_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(CliError::InvalidArgument {
                field: ARG_DELETION_ATTEMPTS,
                reason: "at least one existence check is required".to_owned(),
            });
        }
        let deletion = DeletionPolicy {
            max_attempts,
            interval: self
                .deletion_interval_ms
                .map_or(defaults.interval, Duration::from_millis),
        };
        Ok(settings.with_deletion_policy(deletion))
    }
}
