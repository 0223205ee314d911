//! Shapefile output for decoded feature tables.
//!
//! A shapefile holds a single shape family, so the table's geometries are
//! classified first and written with the matching shape type. Attributes are
//! stored as character fields; `.prj` declares WGS 84 and `.cpg` declares
//! UTF-8 attribute text.

use std::collections::HashSet;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use geo::{Coord, Geometry, LineString};
use layerfeed_core::FormatError;
use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use shapefile::{Multipoint, Point, Polygon, PolygonRing, Polyline};

use super::features::FeatureTable;

/// dBase field names are limited to ten bytes.
const FIELD_NAME_LEN: usize = 10;
/// Longest dBase character field.
const FIELD_VALUE_LEN: u8 = 254;
/// Field written when the source has no attributes.
const FALLBACK_FIELD: &str = "FID";

const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

/// Shape type a shapefile is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeFamily {
    Point,
    Multipoint,
    Polyline,
    Polygon,
}

impl ShapeFamily {
    fn of(geometry: &Geometry<f64>) -> Result<Self, FormatError> {
        match geometry {
            Geometry::Point(_) => Ok(Self::Point),
            Geometry::MultiPoint(_) => Ok(Self::Multipoint),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Ok(Self::Polyline)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Ok(Self::Polygon),
            Geometry::GeometryCollection(_) => Err(FormatError::UnsupportedGeometry {
                kind: "GeometryCollection",
            }),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Multipoint => "multipoint",
            Self::Polyline => "line",
            Self::Polygon => "polygon",
        }
    }

    /// Single points widen to multipoints; other families cannot mix.
    fn unify(self, other: Self) -> Result<Self, FormatError> {
        match (self, other) {
            (left, right) if left == right => Ok(left),
            (Self::Point, Self::Multipoint) | (Self::Multipoint, Self::Point) => {
                Ok(Self::Multipoint)
            }
            (first, second) => Err(FormatError::MixedGeometry {
                first: first.name(),
                second: second.name(),
            }),
        }
    }
}

fn classify(table: &FeatureTable) -> Result<ShapeFamily, FormatError> {
    let mut geometries = table.features.iter().map(|feature| &feature.geometry);
    let first = geometries.next().ok_or(FormatError::NoFeatures)?;
    geometries.try_fold(ShapeFamily::of(first)?, |family, geometry| {
        family.unify(ShapeFamily::of(geometry)?)
    })
}

/// dBase-safe, unique field names for `columns`.
pub(crate) fn field_names(columns: &[String]) -> Vec<String> {
    let mut taken = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let base: String = column
                .chars()
                .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
                .take(FIELD_NAME_LEN)
                .collect();
            let base = if base.is_empty() { "FIELD".to_owned() } else { base };
            let mut candidate = base.clone();
            let mut counter = 1_usize;
            while !taken.insert(candidate.to_ascii_uppercase()) {
                let suffix = format!("_{counter}");
                let keep = FIELD_NAME_LEN.saturating_sub(suffix.len());
                candidate = format!("{}{suffix}", &base[..base.len().min(keep)]);
                counter += 1;
            }
            candidate
        })
        .collect()
}

fn truncate_value(value: &str) -> String {
    let limit = usize::from(FIELD_VALUE_LEN);
    if value.len() <= limit {
        return value.to_owned();
    }
    let mut end = limit;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_owned()
}

fn shapefile_error(err: impl std::fmt::Display) -> FormatError {
    FormatError::Shapefile {
        message: err.to_string(),
    }
}

fn write_text(path: &Utf8Path, text: &str) -> Result<(), FormatError> {
    layerfeed_fs::create_file(path)
        .and_then(|mut file| file.write_all(text.as_bytes()))
        .map_err(|source| FormatError::Io {
            path: path.to_owned(),
            source,
        })
}

fn to_point(coord: Coord<f64>) -> Point {
    Point::new(coord.x, coord.y)
}

fn ring(line: &LineString<f64>) -> Vec<Point> {
    line.coords().map(|coord| to_point(*coord)).collect()
}

fn as_multipoint(geometry: &Geometry<f64>, feature: usize) -> Result<Multipoint, FormatError> {
    let points: Vec<Point> = match geometry {
        Geometry::Point(point) => vec![to_point(point.0)],
        Geometry::MultiPoint(points) => points.iter().map(|point| to_point(point.0)).collect(),
        _ => Vec::new(),
    };
    if points.is_empty() {
        return Err(FormatError::DegenerateGeometry {
            feature,
            kind: "multipoint",
        });
    }
    Ok(Multipoint::new(points))
}

fn as_polyline(geometry: &Geometry<f64>, feature: usize) -> Result<Polyline, FormatError> {
    let parts: Vec<Vec<Point>> = match geometry {
        Geometry::Line(line) => vec![vec![to_point(line.start), to_point(line.end)]],
        Geometry::LineString(line) => vec![ring(line)],
        Geometry::MultiLineString(lines) => lines.iter().map(ring).collect(),
        _ => Vec::new(),
    };
    if parts.is_empty() || parts.iter().any(|part| part.len() < 2) {
        return Err(FormatError::DegenerateGeometry {
            feature,
            kind: "line",
        });
    }
    Ok(Polyline::with_parts(parts))
}

fn as_polygon(geometry: &Geometry<f64>, feature: usize) -> Result<Polygon, FormatError> {
    let polygons: Vec<geo::Polygon<f64>> = match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(polygons) => polygons.0.clone(),
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        _ => Vec::new(),
    };
    let mut rings = Vec::new();
    for polygon in &polygons {
        rings.push(PolygonRing::Outer(ring(polygon.exterior())));
        rings.extend(polygon.interiors().iter().map(|hole| PolygonRing::Inner(ring(hole))));
    }
    // A closed ring needs three distinct vertices plus the repeated first one.
    let degenerate = rings.is_empty()
        || rings.iter().any(|ring| match ring {
            PolygonRing::Outer(points) | PolygonRing::Inner(points) => points.len() < 4,
        });
    if degenerate {
        return Err(FormatError::DegenerateGeometry {
            feature,
            kind: "polygon",
        });
    }
    Ok(Polygon::with_rings(rings))
}

/// Write `<dir>/<stem>.{shp,shx,dbf,prj,cpg}` and return the member paths.
pub(crate) fn write_shapefile(
    table: &FeatureTable,
    dir: &Utf8Path,
    stem: &str,
) -> Result<Vec<Utf8PathBuf>, FormatError> {
    let family = classify(table)?;
    let (names, use_fallback) = if table.columns.is_empty() {
        (vec![FALLBACK_FIELD.to_owned()], true)
    } else {
        (field_names(&table.columns), false)
    };

    let mut builder = TableWriterBuilder::new();
    for name in &names {
        let field = FieldName::try_from(name.as_str())
            .map_err(|err| shapefile_error(format!("invalid field name {name}: {err:?}")))?;
        builder = builder.add_character_field(field, FIELD_VALUE_LEN);
    }

    let shp = dir.join(format!("{stem}.shp"));
    let mut writer =
        shapefile::Writer::from_path(shp.as_std_path(), builder).map_err(shapefile_error)?;
    for (index, feature) in table.features.iter().enumerate() {
        let mut record = dbase::Record::default();
        if use_fallback {
            record.insert(
                FALLBACK_FIELD.to_owned(),
                FieldValue::Character(Some(index.to_string())),
            );
        } else {
            for (name, value) in names.iter().zip(&feature.attributes) {
                record.insert(
                    name.clone(),
                    FieldValue::Character(value.as_deref().map(truncate_value)),
                );
            }
        }
        let written = match family {
            ShapeFamily::Point => match &feature.geometry {
                Geometry::Point(point) => writer.write_shape_and_record(&to_point(point.0), &record),
                _ => {
                    return Err(FormatError::DegenerateGeometry {
                        feature: index,
                        kind: "point",
                    });
                }
            },
            ShapeFamily::Multipoint => {
                writer.write_shape_and_record(&as_multipoint(&feature.geometry, index)?, &record)
            }
            ShapeFamily::Polyline => {
                writer.write_shape_and_record(&as_polyline(&feature.geometry, index)?, &record)
            }
            ShapeFamily::Polygon => {
                writer.write_shape_and_record(&as_polygon(&feature.geometry, index)?, &record)
            }
        };
        written.map_err(shapefile_error)?;
    }
    drop(writer);

    let prj = dir.join(format!("{stem}.prj"));
    write_text(&prj, WGS84_PRJ)?;
    let cpg = dir.join(format!("{stem}.cpg"));
    write_text(&cpg, "UTF-8")?;

    verify(&shp, table.features.len())?;
    Ok(["shp", "shx", "dbf"]
        .iter()
        .map(|extension| dir.join(format!("{stem}.{extension}")))
        .chain([prj, cpg])
        .collect())
}

/// Read the shapefile back and check every feature landed.
fn verify(shp: &Utf8Path, expected: usize) -> Result<(), FormatError> {
    let mut reader = shapefile::Reader::from_path(shp.as_std_path()).map_err(shapefile_error)?;
    let mut count = 0_usize;
    for entry in reader.iter_shapes_and_records() {
        entry.map_err(shapefile_error)?;
        count += 1;
    }
    if count == expected {
        Ok(())
    } else {
        Err(shapefile_error(format!(
            "wrote {expected} feature(s) but read back {count}"
        )))
    }
}
