// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a cache, journal or storage backend operation.
///
/// The input variants ([`InvalidKey`][Error::InvalidKey], [`InvalidTag`][Error::InvalidTag]) are
/// raised before any I/O takes place. The construction variants are only produced while an
/// engine, journal or backend is being set up. The remaining variants describe a failed storage
/// round trip; engines report those as an unsuccessful operation instead of propagating them.
///
/// # Example
///
/// ```
/// use stowage_tier::Error;
///
/// let error = Error::storage("connection reset");
/// assert!(!error.is_invalid_input());
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A cache key is empty, too long or contains a reserved character.
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),

    /// A tag is empty or contains a character that cannot be persisted.
    #[error("invalid cache tag {0:?}")]
    InvalidTag(String),

    /// A namespace does not follow the key syntax.
    #[error("invalid cache namespace {0:?}")]
    InvalidNamespace(String),

    /// A cache directory is missing, is not a directory or is not writable.
    #[error("cache directory {} does not exist or is not writable", .0.display())]
    InvalidDirectory(PathBuf),

    /// A storage backend or journal could not be configured.
    #[error("invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    /// A file system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("cache value codec failed")]
    Codec(#[source] BoxError),

    /// The underlying store rejected or failed an operation.
    #[error("cache storage operation failed")]
    Storage(#[source] BoxError),
}

impl Error {
    /// Creates a storage error from any error or message.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_tier::Error;
    ///
    /// let error = Error::storage("operation failed");
    /// ```
    pub fn storage(cause: impl Into<BoxError>) -> Self {
        Self::Storage(cause.into())
    }

    /// Creates a codec error from any error or message.
    pub fn codec(cause: impl Into<BoxError>) -> Self {
        Self::Codec(cause.into())
    }

    /// Returns `true` when the error was caused by an invalid key or tag supplied by the caller.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidTag(_))
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn invalid_key_display_contains_key() {
        let error = Error::InvalidKey("bad/key".to_string());
        assert_eq!(error.to_string(), "invalid cache key \"bad/key\"");
        assert!(error.is_invalid_input());
    }

    #[test]
    fn invalid_directory_display_contains_path() {
        let error = Error::InvalidDirectory(PathBuf::from("/does/not/exist"));
        let display_str = error.to_string();
        assert!(display_str.contains("/does/not/exist"), "got: {display_str}");
        assert!(!error.is_invalid_input());
    }

    #[test]
    fn storage_error_exposes_source() {
        let error = Error::storage("disk on fire");
        let source = error.source().expect("storage error should have a source");
        assert_eq!(source.to_string(), "disk on fire");
    }

    #[test]
    fn io_error_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = Error::from(io);
        assert!(matches!(error, Error::Io(_)));
        assert_eq!(error.to_string(), "read-only");
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::codec("truncated input"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(matches!(err, Error::Codec(_)));
    }
}
