//! Decoding of tabular and GeoJSON payloads into a uniform feature table.

use std::str::FromStr;

use geo::Geometry;
use geojson::GeoJson;
use layerfeed_core::FormatError;
use log::warn;
use serde_json::Value;
use wkt::TryFromWkt;

/// Geometry columns recognised in CSV input, in order of preference.
pub const GEOMETRY_COLUMNS: [&str; 5] = ["mt:shape", "erl:shape", "shape", "geom", "geometry"];

/// One decoded feature. `attributes` is aligned with [`FeatureTable::columns`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Feature {
    pub(crate) geometry: Geometry<f64>,
    pub(crate) attributes: Vec<Option<String>>,
}

/// Features sharing one attribute schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FeatureTable {
    pub(crate) columns: Vec<String>,
    pub(crate) features: Vec<Feature>,
}

/// Read CSV with a WKT geometry column.
///
/// Rows with an empty geometry cell are skipped.
pub(crate) fn from_csv(bytes: &[u8]) -> Result<FeatureTable, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(bytes);
    let header: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').to_owned())
        .collect();
    let geometry_index = geometry_column(&header).ok_or_else(|| FormatError::MissingGeometryColumn {
        columns: header.clone(),
    })?;
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != geometry_index)
        .map(|(_, name)| name.clone())
        .collect();

    let mut features = Vec::new();
    let mut skipped = 0_usize;
    for (offset, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row = offset + 1;
        let cell = record.get(geometry_index).unwrap_or_default().trim();
        if cell.is_empty() {
            skipped += 1;
            continue;
        }
        let geometry = parse_wkt(cell).map_err(|message| FormatError::InvalidWkt { row, message })?;
        let attributes = record
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != geometry_index)
            .map(|(_, value)| (!value.is_empty()).then(|| value.to_owned()))
            .collect();
        features.push(Feature {
            geometry,
            attributes,
        });
    }
    if skipped > 0 {
        warn!("skipped {skipped} CSV row(s) without geometry");
    }
    Ok(FeatureTable { columns, features })
}

fn csv_error(err: csv::Error) -> FormatError {
    FormatError::Csv {
        message: err.to_string(),
    }
}

fn geometry_column(header: &[String]) -> Option<usize> {
    GEOMETRY_COLUMNS.iter().find_map(|candidate| {
        header
            .iter()
            .position(|name| name.trim().eq_ignore_ascii_case(candidate))
    })
}

/// Parse WKT, accepting an EWKT `SRID=n;` prefix.
fn parse_wkt(cell: &str) -> Result<Geometry<f64>, String> {
    let text = match cell.split_once(';') {
        Some((prefix, rest)) if prefix.trim().to_ascii_uppercase().starts_with("SRID=") => rest,
        _ => cell,
    };
    Geometry::try_from_wkt_str(text.trim()).map_err(|err| err.to_string())
}

/// Read a GeoJSON feature collection, single feature or bare geometry.
///
/// Features without geometry are skipped. Columns are the union of property
/// names in first-seen order.
pub(crate) fn from_geojson(bytes: &[u8]) -> Result<FeatureTable, FormatError> {
    let text = std::str::from_utf8(bytes).map_err(|err| FormatError::InvalidGeoJson {
        message: err.to_string(),
    })?;
    let document = GeoJson::from_str(text).map_err(|err| FormatError::InvalidGeoJson {
        message: err.to_string(),
    })?;
    let features = match document {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };

    let mut columns: Vec<String> = Vec::new();
    let mut decoded = Vec::with_capacity(features.len());
    let mut skipped = 0_usize;
    for feature in features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry.value).map_err(|err| {
            FormatError::InvalidGeoJson {
                message: err.to_string(),
            }
        })?;
        let properties = feature.properties.unwrap_or_default();
        for key in properties.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        decoded.push((geometry, properties));
    }
    if skipped > 0 {
        warn!("skipped {skipped} GeoJSON feature(s) without geometry");
    }

    let features = decoded
        .into_iter()
        .map(|(geometry, properties)| Feature {
            geometry,
            attributes: columns
                .iter()
                .map(|column| properties.get(column).and_then(property_text))
                .collect(),
        })
        .collect();
    Ok(FeatureTable { columns, features })
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
