//! Feature type discovery from WFS capabilities documents.

use quick_xml::Reader;
use quick_xml::events::Event;

/// Names of every advertised `FeatureType`, in document order.
///
/// Namespace prefixes on the elements are ignored, so WFS 1.x and 2.x
/// documents read the same way.
pub(crate) fn feature_type_names(document: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();
    let mut names = Vec::new();
    let mut feature_depth: Option<usize> = None;
    let mut depth: usize = 0;
    let mut in_name = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                depth += 1;
                match element.local_name().as_ref() {
                    b"FeatureType" => feature_depth = Some(depth),
                    b"Name" if feature_depth == Some(depth - 1) => in_name = true,
                    _ => {}
                }
            }
            Ok(Event::End(element)) => {
                if element.local_name().as_ref() == b"FeatureType" {
                    feature_depth = None;
                }
                in_name = false;
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(text)) if in_name => {
                let name = text.unescape().map_err(|err| err.to_string())?;
                let name = name.trim();
                if !name.is_empty() {
                    names.push(name.to_owned());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "malformed XML at byte {}: {err}",
                    reader.buffer_position()
                ));
            }
        }
        buf.clear();
    }
    Ok(names)
}

/// Pick the type name for `search_name`: an exact match wins, otherwise the
/// first advertised name containing it.
pub(crate) fn resolve_type_name<'a>(names: &'a [String], search_name: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|name| *name == search_name)
        .or_else(|| names.iter().find(|name| name.contains(search_name)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const WFS_110: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities version="1.1.0" xmlns:wfs="http://www.opengis.net/wfs">
  <ows:ServiceIdentification xmlns:ows="http://www.opengis.net/ows">
    <ows:Title>Territorial data</ows:Title>
  </ows:ServiceIdentification>
  <FeatureTypeList>
    <FeatureType>
      <Name>geo:Roads_Main</Name>
      <Title>Main roads</Title>
    </FeatureType>
    <FeatureType>
      <Name>geo:Roads</Name>
      <Title>Roads</Title>
    </FeatureType>
    <FeatureType>
      <Name>hydro:Rivers &amp; Lakes</Name>
    </FeatureType>
  </FeatureTypeList>
</wfs:WFS_Capabilities>"#;

    const WFS_200: &str = r#"<wfs:WFS_Capabilities version="2.0.0" xmlns:wfs="http://www.opengis.net/wfs/2.0">
  <wfs:FeatureTypeList>
    <wfs:FeatureType><wfs:Name>ms:parcels</wfs:Name></wfs:FeatureType>
  </wfs:FeatureTypeList>
</wfs:WFS_Capabilities>"#;

    #[rstest]
    fn lists_feature_type_names_only() {
        let names = feature_type_names(WFS_110.as_bytes()).expect("document parses");
        assert_eq!(names, vec!["geo:Roads_Main", "geo:Roads", "hydro:Rivers & Lakes"]);
    }

    #[rstest]
    fn ignores_namespace_prefixes() {
        let names = feature_type_names(WFS_200.as_bytes()).expect("document parses");
        assert_eq!(names, vec!["ms:parcels"]);
    }

    #[rstest]
    fn reports_malformed_documents() {
        assert!(feature_type_names(b"<FeatureTypeList><FeatureType></FeatureTypeList>").is_err());
    }

    #[rstest]
    #[case("geo:Roads", Some("geo:Roads"))]
    #[case("Roads", Some("geo:Roads_Main"))]
    #[case("Rivers", Some("hydro:Rivers & Lakes"))]
    #[case("railways", None)]
    fn resolves_exact_then_partial_matches(#[case] search: &str, #[case] expected: Option<&str>) {
        let names = feature_type_names(WFS_110.as_bytes()).expect("document parses");
        assert_eq!(resolve_type_name(&names, search), expected);
    }
}
