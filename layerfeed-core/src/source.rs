//! Upstream feature and map services.

use std::fmt;

use thiserror::Error;

/// Encodings the pipeline can normalise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Comma-separated values with a WKT geometry column.
    Csv,
    /// A GeoJSON feature collection.
    GeoJson,
    /// A zipped ESRI shapefile.
    ShapeZip,
}

impl OutputFormat {
    /// Interpret a manifest `output_format` value.
    ///
    /// Accepts `csv`, `GeoJSON`, `json` and `SHAPE-ZIP`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnsupportedFormat`] for any other value.
    ///
    /// # Examples
    ///
    /// ```
    /// use layerfeed_core::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::parse("json").ok(), Some(OutputFormat::GeoJson));
    /// assert!(OutputFormat::parse("KML").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "geojson" | "json" => Ok(Self::GeoJson),
            "shape-zip" => Ok(Self::ShapeZip),
            _ => Err(FetchError::UnsupportedFormat {
                format: raw.to_owned(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::GeoJson => f.write_str("GeoJSON"),
            Self::ShapeZip => f.write_str("SHAPE-ZIP"),
        }
    }
}

/// Parameters for a feature download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRequest<'a> {
    /// Service endpoint.
    pub link: &'a str,
    /// Identifier the layer is looked up by.
    pub search_name: &'a str,
    /// Encoding as written in the manifest; forwarded verbatim.
    pub output_format: &'a str,
    /// Protocol version.
    pub version: &'a str,
}

/// A downloaded feature stream tagged with its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePayload {
    /// Encoding of `bytes`.
    pub format: OutputFormat,
    /// Raw response body.
    pub bytes: Vec<u8>,
}

/// Errors raised while talking to upstream services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// The manifest asked for an encoding the pipeline cannot read.
    #[error("unsupported output format {format:?}")]
    UnsupportedFormat {
        /// Format as written in the manifest.
        format: String,
    },
    /// The service does not advertise a layer matching the search name.
    #[error("no layer matching {search_name} advertised by {url}")]
    LayerNotFound {
        /// Search name from the manifest.
        search_name: String,
        /// Capabilities URL.
        url: String,
    },
    /// The service answered with an empty body.
    #[error("empty response from {url}")]
    EmptyResponse {
        /// Request URL.
        url: String,
    },
    /// The service returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
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
    /// The capabilities document could not be parsed.
    #[error("invalid capabilities document from {url}: {message}")]
    Capabilities {
        /// Capabilities URL.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The link is not a usable URL.
    #[error("invalid service link {link:?}: {message}")]
    InvalidLink {
        /// Link from the manifest.
        link: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// Access to remote feature and map services.
pub trait FeatureSource {
    /// Download the features of one layer.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the format is unsupported, the layer is not
    /// advertised, or the request fails.
    fn fetch_features(&self, request: &FeatureRequest<'_>) -> Result<FeaturePayload, FetchError>;

    /// Check that the map service at `link` answers a capabilities request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the service is unreachable or answers with
    /// an error status.
    fn probe_map_service(&self, link: &str, version: &str) -> Result<(), FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("csv", OutputFormat::Csv)]
    #[case("CSV", OutputFormat::Csv)]
    #[case("GeoJSON", OutputFormat::GeoJson)]
    #[case("json", OutputFormat::GeoJson)]
    #[case("SHAPE-ZIP", OutputFormat::ShapeZip)]
    #[case("shape-zip", OutputFormat::ShapeZip)]
    fn parses_known_formats(#[case] raw: &str, #[case] expected: OutputFormat) {
        assert_eq!(OutputFormat::parse(raw), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("kml")]
    #[case("application/gml+xml")]
    fn rejects_unknown_formats(#[case] raw: &str) {
        assert_eq!(
            OutputFormat::parse(raw),
            Err(FetchError::UnsupportedFormat {
                format: raw.to_owned()
            })
        );
    }
}
