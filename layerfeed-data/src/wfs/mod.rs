//! HTTP implementation of [`FeatureSource`] for OGC web services.
//!
//! [`HttpFeatureSource`] resolves a layer's exact type name from the WFS
//! capabilities document, then downloads its features with `GetFeature`.
//! Map services are only probed: a WMS `GetCapabilities` request must answer
//! with a success status.
//!
//! # Example
//!
//! ```no_run
//! use layerfeed_core::{FeatureRequest, FeatureSource};
//! use layerfeed_data::wfs::{FeatureSourceSettings, HttpFeatureSource};
//!
//! let source = HttpFeatureSource::new(FeatureSourceSettings::default())?;
//! let payload = source.fetch_features(&FeatureRequest {
//!     link: "https://data.example.test/geoserver/wfs",
//!     search_name: "roads",
//!     output_format: "GeoJSON",
//!     version: "2.0.0",
//! })?;
//! println!("{} bytes of {}", payload.bytes.len(), payload.format);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod capabilities;
mod query;


use std::time::Duration;

use layerfeed_core::{FeaturePayload, FeatureRequest, FeatureSource, FetchError, OutputFormat};
use log::{debug, info};
use reqwest::Client;
use reqwest::header::USER_AGENT;
use url::Url;

use crate::runtime::BlockingRuntime;

/// Default user agent for feature requests.
pub const DEFAULT_USER_AGENT: &str = "layerfeed-wfs/0.1";

/// Default request timeout in seconds. Feature downloads can be large.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Longest error body excerpt carried in a [`FetchError::Http`].
const ERROR_EXCERPT_CHARS: usize = 200;

/// Configuration for [`HttpFeatureSource`].
#[derive(Debug, Clone)]
pub struct FeatureSourceSettings {
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for FeatureSourceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl FeatureSourceSettings {
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
}

/// Error type for [`HttpFeatureSource`] construction failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Blocking WFS/WMS client.
#[derive(Debug)]
pub struct HttpFeatureSource {
    client: Client,
    settings: FeatureSourceSettings,
    runtime: BlockingRuntime,
}

impl HttpFeatureSource {
    /// Build a source from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(settings: FeatureSourceSettings) -> Result<Self, SourceBuildError> {
        let client = Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(SourceBuildError::HttpClient)?;
        let runtime = BlockingRuntime::new().map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            settings,
            runtime,
        })
    }

    fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        debug!("GET {url}");
        self.runtime.block_on(self.get_async(url))
    }

    async fn get_async(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.settings.user_agent.as_str())
            .send()
            .await
            .map_err(|err| network_error(&err, url))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| network_error(&err, url))?;
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }
        Ok(body.to_vec())
    }

    fn resolve_type_name(&self, base: &Url, request: &FeatureRequest<'_>) -> Result<String, FetchError> {
        let url = query::capabilities(base, "WFS", request.version);
        let document = self.get(&url)?;
        let names = capabilities::feature_type_names(&document).map_err(|message| {
            FetchError::Capabilities {
                url: url.to_string(),
                message,
            }
        })?;
        capabilities::resolve_type_name(&names, request.search_name)
            .map(str::to_owned)
            .ok_or_else(|| FetchError::LayerNotFound {
                search_name: request.search_name.to_owned(),
                url: url.to_string(),
            })
    }
}

fn parse_link(link: &str) -> Result<Url, FetchError> {
    query::base_url(link).map_err(|err| FetchError::InvalidLink {
        link: link.to_owned(),
        message: err.to_string(),
    })
}

fn network_error(error: &reqwest::Error, url: &Url) -> FetchError {
    let message = if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        error.to_string()
    };
    FetchError::Network {
        url: url.to_string(),
        message,
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }
    trimmed.chars().take(ERROR_EXCERPT_CHARS).collect()
}

impl FeatureSource for HttpFeatureSource {
    fn fetch_features(&self, request: &FeatureRequest<'_>) -> Result<FeaturePayload, FetchError> {
        let format = OutputFormat::parse(request.output_format)?;
        let base = parse_link(request.link)?;
        let type_name = self.resolve_type_name(&base, request)?;
        debug!("{} resolved to {type_name}", request.search_name);

        let url = query::get_feature(&base, &type_name, request.output_format, request.version);
        let bytes = self.get(&url)?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyResponse {
                url: url.to_string(),
            });
        }
        info!(
            "fetched {} bytes of {format} for {type_name}",
            bytes.len()
        );
        Ok(FeaturePayload { format, bytes })
    }

    fn probe_map_service(&self, link: &str, version: &str) -> Result<(), FetchError> {
        let base = parse_link(link)?;
        self.get(&query::capabilities(&base, "WMS", version))
            .map(|_| ())
    }
}
