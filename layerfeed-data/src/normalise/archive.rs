//! Zip bundles of shapefile members.

use std::io::{Cursor, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use layerfeed_core::FormatError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Members carried into a bundle; the first three are mandatory.
const MEMBER_EXTENSIONS: [&str; 5] = [".shp", ".shx", ".dbf", ".prj", ".cpg"];
const REQUIRED_MEMBERS: usize = 3;

fn archive_error(err: impl std::fmt::Display) -> FormatError {
    FormatError::Archive {
        message: err.to_string(),
    }
}

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn create_writer(target: &Utf8Path) -> Result<ZipWriter<std::fs::File>, FormatError> {
    let file = layerfeed_fs::create_file(target).map_err(|source| FormatError::Io {
        path: target.to_owned(),
        source,
    })?;
    Ok(ZipWriter::new(file))
}

/// Zip `members` flat into `target`, each under its file name.
pub(crate) fn pack(members: &[Utf8PathBuf], target: &Utf8Path) -> Result<(), FormatError> {
    let mut writer = create_writer(target)?;
    for member in members {
        let name = member.file_name().ok_or_else(|| {
            archive_error(format!("member path {member} has no file name"))
        })?;
        let bytes = layerfeed_fs::read_file(member).map_err(|source| FormatError::Io {
            path: member.clone(),
            source,
        })?;
        writer.start_file(name, options()).map_err(archive_error)?;
        writer.write_all(&bytes).map_err(archive_error)?;
    }
    writer.finish().map_err(archive_error)?;
    Ok(())
}

/// Path stem and canonical extension of `name` if it is a carried member.
fn member_extension(name: &str) -> Option<(&str, &'static str)> {
    let (path_stem, extension) = name.rsplit_once('.')?;
    MEMBER_EXTENSIONS
        .iter()
        .find(|candidate| extension.eq_ignore_ascii_case(&candidate[1..]))
        .map(|candidate| (path_stem, *candidate))
}

/// Rewrite a downloaded zipped shapefile as `target` with members `<stem>.*`.
///
/// The first `.shp` member decides which shapefile is kept; its sidecars are
/// the members sharing its path stem. Other entries are dropped.
pub(crate) fn repack(bytes: &[u8], target: &Utf8Path, stem: &str) -> Result<(), FormatError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;
    let names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    let source_stem = names
        .iter()
        .filter_map(|name| member_extension(name))
        .find(|(_, extension)| *extension == ".shp")
        .map(|(path_stem, _)| path_stem.to_owned())
        .ok_or(FormatError::MissingMember { extension: ".shp" })?;

    let mut members: Vec<(&'static str, String)> = names
        .iter()
        .filter_map(|name| {
            member_extension(name)
                .filter(|(path_stem, _)| *path_stem == source_stem)
                .map(|(_, extension)| (extension, name.clone()))
        })
        .collect();
    members.sort_by_key(|(extension, _)| MEMBER_EXTENSIONS.iter().position(|e| e == extension));
    members.dedup_by_key(|(extension, _)| *extension);
    for required in &MEMBER_EXTENSIONS[..REQUIRED_MEMBERS] {
        if !members.iter().any(|(extension, _)| extension == required) {
            return Err(FormatError::MissingMember {
                extension: *required,
            });
        }
    }

    let mut writer = create_writer(target)?;
    for (extension, name) in members {
        let mut entry = archive.by_name(&name).map_err(archive_error)?;
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(archive_error)?;
        writer
            .start_file(format!("{stem}{extension}"), options())
            .map_err(archive_error)?;
        writer.write_all(&contents).map_err(archive_error)?;
    }
    writer.finish().map_err(archive_error)?;
    Ok(())
}
