//! OGC key-value-pair request URLs.
//!
//! Manifest links often carry their own `service`/`request` parameters. They
//! are dropped (case-insensitively) before the protocol parameters for the
//! current request are appended, so each request carries exactly one copy.

use url::Url;

const PROTOCOL_KEYS: [&str; 6] = [
    "service",
    "version",
    "request",
    "typename",
    "typenames",
    "outputformat",
];

/// Parse `link` and drop any protocol parameters it already carries.
pub(crate) fn base_url(link: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(link.trim())?;
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            !PROTOCOL_KEYS
                .iter()
                .any(|protocol| key.eq_ignore_ascii_case(protocol))
        })
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.set_query(None);
    if !retained.is_empty() {
        url.query_pairs_mut().extend_pairs(retained);
    }
    Ok(url)
}

/// `GetCapabilities` for `service` (`WFS` or `WMS`).
pub(crate) fn capabilities(base: &Url, service: &str, version: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("service", service)
        .append_pair("version", version)
        .append_pair("request", "GetCapabilities");
    url
}

/// `GetFeature` for one resolved type name.
///
/// WFS 2.x renamed `typeName` to `typeNames`.
pub(crate) fn get_feature(base: &Url, type_name: &str, output_format: &str, version: &str) -> Url {
    let type_key = if version.trim().starts_with('2') {
        "typeNames"
    } else {
        "typeName"
    };
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("service", "WFS")
        .append_pair("version", version)
        .append_pair("request", "GetFeature")
        .append_pair(type_key, type_name)
        .append_pair("outputFormat", output_format);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://data.example.test/geoserver/wfs",
        "https://data.example.test/geoserver/wfs"
    )]
    #[case(
        "https://data.example.test/wfs?SERVICE=WFS&REQUEST=GetCapabilities&map=roads",
        "https://data.example.test/wfs?map=roads"
    )]
    #[case(
        "https://data.example.test/wfs?typeName=a&outputFormat=csv&Version=2.0.0",
        "https://data.example.test/wfs"
    )]
    fn strips_protocol_parameters(#[case] link: &str, #[case] expected: &str) {
        assert_eq!(base_url(link).expect("valid link").as_str(), expected);
    }

    #[rstest]
    fn rejects_relative_links() {
        assert!(base_url("geoserver/wfs").is_err());
    }

    #[rstest]
    #[case("1.0.0", "typeName=roads%3Amain")]
    #[case("1.1.0", "typeName=roads%3Amain")]
    #[case("2.0.0", "typeNames=roads%3Amain")]
    fn type_name_key_follows_version(#[case] version: &str, #[case] expected: &str) {
        let base = base_url("https://data.example.test/wfs").expect("valid link");
        let url = get_feature(&base, "roads:main", "GeoJSON", version);
        let query = url.query().unwrap_or_default();
        assert!(query.contains(expected), "{query}");
        assert!(query.contains("request=GetFeature"));
        assert!(query.contains("outputFormat=GeoJSON"));
    }

    #[rstest]
    fn capabilities_keeps_vendor_parameters() {
        let base = base_url("https://maps.example.test/wms?map=/srv/base.map&request=GetMap")
            .expect("valid link");
        let url = capabilities(&base, "WMS", "1.3.0");
        assert_eq!(
            url.as_str(),
            "https://maps.example.test/wms?map=%2Fsrv%2Fbase.map&service=WMS&version=1.3.0&request=GetCapabilities"
        );
    }
}
