//! Filesystem checks applied to resolved configuration.

use camino::Utf8Path;

use crate::CliError;

/// Require `path` to name an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match layerfeed_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) if path.exists() => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Require `path` to be a directory or not to exist yet.
pub(crate) fn require_output_dir(path: &Utf8Path) -> Result<(), CliError> {
    if path.exists() && !path.is_dir() {
        return Err(CliError::OutputDirectoryNotDirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
