//! Shapefile bundles from fetched feature payloads.
//!
//! CSV and GeoJSON payloads are decoded into a feature table, written as a
//! shapefile in a scratch directory, read back, and zipped. Zipped shapefile
//! payloads are repacked so their members carry the requested stem.

mod archive;
mod features;
mod writer;

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::{FeaturePayload, FormatError, Normaliser, OutputFormat};
use log::info;

pub use features::GEOMETRY_COLUMNS;

/// [`Normaliser`] producing zipped ESRI shapefiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileNormaliser;

impl ShapefileNormaliser {
    /// A normaliser with default behaviour.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn scratch_dir() -> Result<(tempfile::TempDir, Utf8PathBuf), FormatError> {
    let dir = tempfile::tempdir().map_err(|source| FormatError::Io {
        path: Utf8PathBuf::from(std::env::temp_dir().to_string_lossy().into_owned()),
        source,
    })?;
    let path = Utf8Path::from_path(dir.path())
        .ok_or_else(|| FormatError::Shapefile {
            message: format!("scratch directory {} is not UTF-8", dir.path().display()),
        })?
        .to_owned();
    Ok((dir, path))
}

impl Normaliser for ShapefileNormaliser {
    fn normalise(
        &self,
        payload: &FeaturePayload,
        target_dir: &Utf8Path,
        stem: &str,
    ) -> Result<Utf8PathBuf, FormatError> {
        layerfeed_fs::ensure_dir(target_dir).map_err(|source| FormatError::Io {
            path: target_dir.to_owned(),
            source,
        })?;
        let target = target_dir.join(format!("{stem}.zip"));

        let table = match payload.format {
            OutputFormat::ShapeZip => {
                archive::repack(&payload.bytes, &target, stem)?;
                info!("repacked shapefile archive into {target}");
                return Ok(target);
            }
            OutputFormat::Csv => features::from_csv(&payload.bytes)?,
            OutputFormat::GeoJson => features::from_geojson(&payload.bytes)?,
        };

        let (_scratch, scratch_path) = scratch_dir()?;
        let members = writer::write_shapefile(&table, &scratch_path, stem)?;
        archive::pack(&members, &target)?;
        info!(
            "wrote {} feature(s) from {} into {target}",
            table.features.len(),
            payload.format
        );
        Ok(target)
    }
}
