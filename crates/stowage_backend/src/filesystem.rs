// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;
use std::path::{Path, PathBuf};

use stowage_tier::{KeyValidator, Namespace, Result, fs};

const EXTENSION: &str = "cache";

/// Value store keeping one `<key>.cache` file per value.
///
/// Named namespaces live in a subdirectory of the base directory; the default namespace uses the
/// base directory itself. Writes are atomic per key. Only `.cache` files directly inside the
/// backend's directory are ever removed, so other namespaces and metadata files next to the
/// values are left alone.
///
/// # Examples
///
/// ```
/// use stowage_backend::FilesystemBackend;
/// use stowage_tier::Namespace;
///
/// let base = tempfile::tempdir()?;
/// let backend = FilesystemBackend::with_namespace(base.path(), &Namespace::new("users")?)?;
/// assert_eq!(backend.dir(), base.path().join("users"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    dir: PathBuf,
}

impl FilesystemBackend {
    /// Creates a backend storing values directly in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDirectory`][stowage_tier::Error::InvalidDirectory] unless `dir` is
    /// an existing, writable directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            dir: fs::writable_dir(dir)?,
        })
    }

    /// Creates a backend for `namespace` under the existing, writable directory `base`.
    ///
    /// The namespace subdirectory is created when missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDirectory`][stowage_tier::Error::InvalidDirectory] if `base` is
    /// unusable or the subdirectory cannot be created.
    pub fn with_namespace(base: impl AsRef<Path>, namespace: &Namespace) -> Result<Self> {
        let base = fs::writable_dir(base)?;
        let dir = match namespace.name() {
            Some(name) => fs::create_writable_dir(base.join(name))?,
            None => base,
        };
        Ok(Self { dir })
    }

    /// The directory holding the `.cache` files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        KeyValidator::validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::write_atomic(&self.path(key)?, value)?;
        Ok(())
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        fs::remove_file(&self.path(key)?)?;
        Ok(())
    }

    pub(crate) fn exists(&self, key: &str) -> Result<bool> {
        match std::fs::metadata(self.path(key)?) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn flush(&self) -> Result<()> {
        fs::remove_files_with_extension(&self.dir, EXTENSION)?;
        Ok(())
    }

    pub(crate) fn len(&self) -> Option<u64> {
        let files = fs::files_with_extension(&self.dir, EXTENSION).ok()?;
        u64::try_from(files.len()).ok()
    }
}
