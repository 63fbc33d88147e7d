// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Value stores for stowage cache engines.
//!
//! A [`Backend`] stores opaque bytes under logical cache keys. It knows nothing about expiration
//! or tags beyond an optional native TTL hint; those are tracked by a metadata journal next to
//! it. Every backend is scoped to one namespace, and [`Backend::flush`] only removes values in
//! that scope.
//!
//! # Examples
//!
//! ```
//! use stowage_backend::{Backend, MemoryBackend};
//! use stowage_tier::{MemoryStore, Namespace};
//!
//! let backend = Backend::from(MemoryBackend::new(MemoryStore::new(), Namespace::default()));
//!
//! backend.set("key", b"value", None)?;
//! assert_eq!(backend.get("key")?.as_deref(), Some(&b"value"[..]));
//!
//! backend.delete("key")?;
//! assert!(!backend.exists("key")?);
//! # Ok::<(), stowage_tier::Error>(())
//! ```

mod filesystem;
mod memory;
#[cfg(feature = "redis")]
mod redis;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

use std::time::Duration;

#[doc(inline)]
pub use filesystem::FilesystemBackend;
#[doc(inline)]
pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use redis::RedisBackend;
use stowage_tier::Result;
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use testing::{BackendOp, MockBackend};

/// A value store.
///
/// The set of variants is closed; pick one when assembling an engine.
#[derive(Debug)]
#[non_exhaustive]
pub enum Backend {
    /// Values in a shared, process-local `MemoryStore`.
    Memory(MemoryBackend),
    /// One `<key>.cache` file per value.
    Filesystem(FilesystemBackend),
    /// Redis strings.
    #[cfg(feature = "redis")]
    Redis(RedisBackend),
    /// Stores nothing.
    Null,
    /// Recording store with failure injection, for tests.
    #[cfg(any(feature = "test-util", test))]
    Mock(MockBackend),
}

impl Backend {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be read.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Memory(b) => Ok(b.get(key)),
            Self::Filesystem(b) => b.get(key),
            #[cfg(feature = "redis")]
            Self::Redis(b) => b.get(key),
            Self::Null => Ok(None),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => b.get(key),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// `native_ttl` is a hint for stores that can expire values themselves; others ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be written.
    #[cfg_attr(
        not(any(feature = "redis", feature = "test-util", test)),
        expect(unused_variables, reason = "only the Redis and mock stores take a native TTL")
    )]
    pub fn set(&self, key: &str, value: &[u8], native_ttl: Option<Duration>) -> Result<()> {
        match self {
            Self::Memory(b) => {
                b.set(key, value);
                Ok(())
            }
            Self::Filesystem(b) => b.set(key, value),
            #[cfg(feature = "redis")]
            Self::Redis(b) => b.set(key, value, native_ttl),
            Self::Null => Ok(()),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => b.set(key, value, native_ttl),
        }
    }

    /// Removes the value stored under `key`; removing an absent value succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing value could not be removed.
    pub fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Memory(b) => {
                b.delete(key);
                Ok(())
            }
            Self::Filesystem(b) => b.delete(key),
            #[cfg(feature = "redis")]
            Self::Redis(b) => b.delete(key),
            Self::Null => Ok(()),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => b.delete(key),
        }
    }

    /// Returns `true` if a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be queried.
    pub fn exists(&self, key: &str) -> Result<bool> {
        match self {
            Self::Memory(b) => Ok(b.exists(key)),
            Self::Filesystem(b) => b.exists(key),
            #[cfg(feature = "redis")]
            Self::Redis(b) => b.exists(key),
            Self::Null => Ok(false),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => b.exists(key),
        }
    }

    /// Removes every value in this backend's namespace.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; removal continues past individual failures where
    /// the store allows it.
    pub fn flush(&self) -> Result<()> {
        match self {
            Self::Memory(b) => {
                b.flush();
                Ok(())
            }
            Self::Filesystem(b) => b.flush(),
            #[cfg(feature = "redis")]
            Self::Redis(b) => b.flush(),
            Self::Null => Ok(()),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => b.flush(),
        }
    }

    /// Returns the number of stored values when it can be computed without a remote round trip.
    #[must_use]
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Memory(b) => Some(b.len()),
            Self::Filesystem(b) => b.len(),
            #[cfg(feature = "redis")]
            Self::Redis(_) => None,
            Self::Null => Some(0),
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(b) => u64::try_from(b.entry_count()).ok(),
        }
    }

    /// Returns `Some(true)` when [`len`][Self::len] is known to be zero.
    #[must_use]
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// A short name for the variant, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Filesystem(_) => "filesystem",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "redis",
            Self::Null => "null",
            #[cfg(any(feature = "test-util", test))]
            Self::Mock(_) => "mock",
        }
    }
}

impl From<MemoryBackend> for Backend {
    fn from(backend: MemoryBackend) -> Self {
        Self::Memory(backend)
    }
}

impl From<FilesystemBackend> for Backend {
    fn from(backend: FilesystemBackend) -> Self {
        Self::Filesystem(backend)
    }
}

#[cfg(feature = "redis")]
impl From<RedisBackend> for Backend {
    fn from(backend: RedisBackend) -> Self {
        Self::Redis(backend)
    }
}

#[cfg(any(feature = "test-util", test))]
impl From<MockBackend> for Backend {
    fn from(backend: MockBackend) -> Self {
        Self::Mock(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(Backend: Send, Sync, std::fmt::Debug);

    #[test]
    fn null_backend_stores_nothing() {
        let backend = Backend::Null;
        backend.set("k", b"v", None).expect("set succeeds");
        assert_eq!(backend.get("k").expect("get succeeds"), None);
        assert!(!backend.exists("k").expect("exists succeeds"));
        backend.delete("k").expect("delete succeeds");
        backend.flush().expect("flush succeeds");
        assert_eq!(backend.is_empty(), Some(true));
        assert_eq!(backend.kind(), "null");
    }

    #[test]
    fn mock_backend_dispatches_through_enum() {
        let mock = MockBackend::new();
        let backend = Backend::from(mock.clone());

        backend.set("k", b"v", Some(Duration::from_secs(5))).expect("set succeeds");

        assert_eq!(backend.len(), Some(1));
        assert_eq!(
            mock.operations(),
            [BackendOp::Set {
                key: "k".to_string(),
                value: b"v".to_vec(),
                native_ttl: Some(Duration::from_secs(5)),
            }]
        );
    }
}
