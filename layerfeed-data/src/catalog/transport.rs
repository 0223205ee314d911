//! Request/response plumbing between the catalog client and the REST API.
//!
//! [`CatalogTransport`] carries one request to the catalog and returns the
//! raw status and body. Status interpretation belongs to the client, so any
//! transport (HTTP, or the in-memory server used in tests) can back it.

use std::fmt;

use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::settings::CatalogSettings;
use crate::runtime::BlockingRuntime;

/// HTTP methods used by the catalog client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Encoded body.
    pub bytes: Vec<u8>,
}

/// One REST call, addressed relative to the catalog root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the REST root, optionally with a query string.
    pub path: String,
    /// Optional body.
    pub body: Option<RequestBody>,
}

impl CatalogRequest {
    /// A `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }

    /// A `POST` request with a body.
    #[must_use]
    pub fn post(path: impl Into<String>, content_type: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(RequestBody {
                content_type,
                bytes,
            }),
        }
    }

    /// A `PUT` request with a body.
    #[must_use]
    pub fn put(path: impl Into<String>, content_type: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(RequestBody {
                content_type,
                bytes,
            }),
        }
    }

    /// Body decoded as UTF-8, lossily; empty when there is no body.
    #[must_use]
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(&body.bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Status and body returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl CatalogResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure to obtain any response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request URL could not be formed.
    #[error("invalid catalog URL {url}: {message}")]
    InvalidUrl {
        /// URL being formed.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Transport diagnostic.
        message: String,
    },
    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
}

/// Carries catalog requests.
pub trait CatalogTransport {
    /// Send one request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] only when no response was received; error
    /// statuses are returned as ordinary responses.
    fn send(&self, request: &CatalogRequest) -> Result<CatalogResponse, TransportError>;
}

/// Error type for [`HttpCatalogTransport`] construction failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportBuildError {
    /// The base URL is not a valid absolute URL.
    #[error("invalid catalog base URL {url}: {message}")]
    BaseUrl {
        /// Configured base URL.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// [`CatalogTransport`] over HTTP with basic authentication.
pub struct HttpCatalogTransport {
    client: Client,
    base_url: Url,
    settings: CatalogSettings,
    runtime: BlockingRuntime,
}

impl fmt::Debug for HttpCatalogTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCatalogTransport")
            .field("base_url", &self.base_url.as_str())
            .field("settings", &self.settings)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl HttpCatalogTransport {
    /// Build a transport from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(settings: &CatalogSettings) -> Result<Self, TransportBuildError> {
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|err| TransportBuildError::BaseUrl {
            url: settings.base_url.clone(),
            message: err.to_string(),
        })?;
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(TransportBuildError::HttpClient)?;
        let runtime = BlockingRuntime::new().map_err(TransportBuildError::Runtime)?;
        Ok(Self {
            client,
            base_url,
            settings: settings.clone(),
            runtime,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|err| TransportError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                message: err.to_string(),
            })
    }

    async fn send_async(
        &self,
        url: Url,
        request: &CatalogRequest,
    ) -> Result<CatalogResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let display_url = url.to_string();
        let mut builder = self
            .client
            .request(method, url)
            .basic_auth(&self.settings.username, Some(&self.settings.password));
        if let Some(body) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, body.content_type)
                .body(body.bytes.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &display_url))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &display_url))?;
        Ok(CatalogResponse { status, body })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.settings.timeout.as_secs(),
            };
        }
        TransportError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl CatalogTransport for HttpCatalogTransport {
    fn send(&self, request: &CatalogRequest) -> Result<CatalogResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        self.runtime.block_on(self.send_async(url, request))
    }
}
