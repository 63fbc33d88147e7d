// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! File system helpers shared by the file-based journals and storage backends.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Checks that `dir` exists, is a directory and accepts new files.
///
/// # Errors
///
/// Returns [`Error::InvalidDirectory`] otherwise.
pub fn writable_dir(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let is_dir = std::fs::metadata(dir).is_ok_and(|meta| meta.is_dir());
    if is_dir && tempfile::tempfile_in(dir).is_ok() {
        Ok(dir.to_path_buf())
    } else {
        Err(Error::InvalidDirectory(dir.to_path_buf()))
    }
}

/// Creates `dir` (and its parents) if needed, then checks it like [`writable_dir`].
///
/// # Errors
///
/// Returns [`Error::InvalidDirectory`] if the directory cannot be created or written.
pub fn create_writable_dir(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|_source| Error::InvalidDirectory(dir.to_path_buf()))?;
    writable_dir(dir)
}

/// Replaces `path` with `contents` through a temporary file in the same directory.
///
/// Readers observe either the old or the new contents, never a partial write.
///
/// # Errors
///
/// Returns the underlying I/O error if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_data()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Removes `path`; a file that is already gone counts as removed.
///
/// # Errors
///
/// Returns every I/O error other than [`io::ErrorKind::NotFound`].
pub fn remove_file(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Reads `path` to a string; a missing file reads as `None`.
///
/// # Errors
///
/// Returns every I/O error other than [`io::ErrorKind::NotFound`].
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Lists the files directly inside `dir` whose name ends with `.{extension}`, returning each
/// file's stem and path. Entries that cannot be inspected are skipped.
///
/// # Errors
///
/// Returns the I/O error if `dir` itself cannot be listed.
pub fn files_with_extension(dir: &Path, extension: &str) -> io::Result<Vec<(String, PathBuf)>> {
    let suffix = format!(".{extension}");
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }

        let name = entry.file_name();
        let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(suffix.as_str())) else {
            continue;
        };
        files.push((stem.to_string(), entry.path()));
    }

    files.sort();
    Ok(files)
}

/// Removes every file listed by [`files_with_extension`]. All removals are attempted; the first
/// failure is returned.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn remove_files_with_extension(dir: &Path, extension: &str) -> io::Result<()> {
    let mut first_error = None;
    for (_, path) in files_with_extension(dir, extension)? {
        if let Err(e) = remove_file(&path) {
            first_error.get_or_insert(e);
        }
    }

    first_error.map_or(Ok(()), Err)
}
