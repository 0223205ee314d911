//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! Paths arriving from configuration may be absolute or relative. Each helper
//! resolves an ambient base directory and then works through a capability
//! handle relative to it.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs::OpenOptions;
use cap_std::{ambient_authority, fs_utf8};
use std::fs::File;
use std::io;
use std::path::Component;

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Read the whole file at `path`.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read(name.as_str())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create `path` and every missing ancestor.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    if path.as_str().is_empty() || path == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Create (or truncate) the file at `path`, creating missing parent directories.
pub fn create_file(path: &Utf8Path) -> io::Result<File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    Ok(dir.create(name.as_str())?.into_std())
}

/// Open the file at `path` for appending, creating it and its parent directories if needed.
pub fn open_append(path: &Utf8Path) -> io::Result<File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    Ok(dir.open_with(name.as_str(), &options)?.into_std())
}

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Split an absolute or relative path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        // Unix-style absolute path.
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        // Relative path: resolve from the current directory.
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, root)
    }

    #[rstest]
    fn ensure_dir_creates_nested_directories(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = temp_root;
        let nested = root.join("Yukon").join("roads");
        ensure_dir(&nested).expect("create nested dirs");
        assert!(nested.is_dir());
        ensure_dir(&nested).expect("creating twice is fine");
    }

    #[rstest]
    fn open_append_keeps_existing_lines(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = temp_root;
        let log = root.join("logs").join("run.jsonl");
        for line in ["first\n", "second\n"] {
            let mut file = open_append(&log).expect("open log");
            file.write_all(line.as_bytes()).expect("append line");
        }
        let contents = read_file(&log).expect("read log");
        assert_eq!(contents, b"first\nsecond\n");
    }

    #[rstest]
    fn create_file_truncates(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = temp_root;
        let path = root.join("bundle.zip");
        create_file(&path)
            .expect("create")
            .write_all(b"old contents")
            .expect("write");
        create_file(&path).expect("recreate").write_all(b"new").expect("write");
        assert_eq!(read_file(&path).expect("read"), b"new");
    }

    #[rstest]
    fn file_is_file_reports_missing_files(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = temp_root;
        let path = root.join("absent.sld");
        assert!(!file_is_file(&path).expect("query metadata"));
        create_file(&path).expect("create");
        assert!(file_is_file(&path).expect("query metadata"));
    }
}
