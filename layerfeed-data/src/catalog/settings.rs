//! Connection settings for the catalog REST API.

use std::time::Duration;

/// Default user agent for catalog requests.
pub const DEFAULT_USER_AGENT: &str = "layerfeed/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How long to wait for a recursively deleted datastore to disappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionPolicy {
    /// Existence checks performed before giving up.
    pub max_attempts: u32,
    /// Pause before each check.
    pub interval: Duration,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(500),
        }
    }
}

/// Configuration for [`HttpCatalogTransport`](super::HttpCatalogTransport)
/// and the client built on it.
#[derive(Clone)]
pub struct CatalogSettings {
    /// REST root, e.g. `"http://localhost:8080/geoserver/rest"`.
    pub base_url: String,
    /// Basic-auth user name.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Poll budget after recursive datastore deletion.
    pub deletion: DeletionPolicy,
}

impl std::fmt::Debug for CatalogSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("deletion", &self.deletion)
            .finish()
    }
}

impl CatalogSettings {
    /// Settings for the catalog at `base_url` with the given credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            deletion: DeletionPolicy::default(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the deletion poll budget.
    #[must_use]
    pub fn with_deletion_policy(mut self, deletion: DeletionPolicy) -> Self {
        self.deletion = deletion;
        self
    }
}
