// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for assembling cache engines.
//!
//! The builder collects settings and a storage choice, then creates the namespace, directories,
//! value store and journal in one fallible [`build`][CacheEngineBuilder::build] call.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use stowage_backend::{Backend, FilesystemBackend, MemoryBackend};
#[cfg(feature = "sqlite")]
use stowage_journal::SqliteJournal;
use stowage_journal::{FlatFileJournal, IniFileJournal, Journal, MemoryJournal};
use stowage_tier::{Codec, MemoryStore, Namespace, Result, system_clock};
use tick::Clock;

use crate::engine::{CacheEngine, DEFAULT_NAME};
use crate::events::EventListener;
use crate::telemetry::TelemetryConfig;

/// Metadata file layout for filesystem engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum JournalFormat {
    /// One `<key>.meta` file per key, next to the `<key>.cache` value files.
    #[default]
    FlatFile,
    /// A single `journal.ini` file per directory.
    IniFile,
}

/// Storage selected on a [`CacheEngineBuilder`].
pub struct Storage(StorageKind);

enum StorageKind {
    Memory(MemoryStore),
    Filesystem { base: PathBuf, journal: JournalFormat },
    #[cfg(feature = "redis")]
    Redis(redis::Connection),
    Null,
    Custom { backend: Backend, journal: Journal },
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            StorageKind::Memory(store) => f.debug_tuple("Memory").field(store).finish(),
            StorageKind::Filesystem { base, journal } => f
                .debug_struct("Filesystem")
                .field("base", base)
                .field("journal", journal)
                .finish(),
            #[cfg(feature = "redis")]
            StorageKind::Redis(_) => f.write_str("Redis"),
            StorageKind::Null => f.write_str("Null"),
            StorageKind::Custom { backend, journal } => f
                .debug_struct("Custom")
                .field("backend", backend)
                .field("journal", journal)
                .finish(),
        }
    }
}

/// Builder for a [`CacheEngine`].
///
/// Created by [`CacheEngine::builder`]. Settings can be given in any order; a storage choice is
/// required before [`build`][Self::build] becomes available.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stowage::{CacheEngine, CacheLayer, Codec, JournalFormat, Ttl};
///
/// let dir = tempfile::tempdir()?;
/// let engine = CacheEngine::builder()
///     .name("thumbnails")
///     .namespace("thumbs")
///     .default_ttl(Duration::from_secs(3600))
///     .codec(Codec::Bincode)
///     .filesystem(dir.path(), JournalFormat::IniFile)
///     .build()?;
///
/// engine.save("img.1", &vec![1_u8, 2, 3], Ttl::Default)?;
/// assert!(dir.path().join("thumbs").join("img.1.cache").is_file());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct CacheEngineBuilder<S = ()> {
    name: &'static str,
    namespace: Option<String>,
    default_ttl: Option<Duration>,
    codec: Codec,
    clock: Clock,
    telemetry: TelemetryConfig,
    listener: Option<EventListener>,
    #[cfg(feature = "sqlite")]
    sqlite_journal: Option<PathBuf>,
    storage: S,
}

impl CacheEngineBuilder<()> {
    pub(crate) fn new() -> Self {
        Self {
            name: DEFAULT_NAME,
            namespace: None,
            default_ttl: None,
            codec: Codec::default(),
            clock: system_clock(),
            telemetry: TelemetryConfig::default(),
            listener: None,
            #[cfg(feature = "sqlite")]
            sqlite_journal: None,
            storage: (),
        }
    }

    fn with_storage(self, kind: StorageKind) -> CacheEngineBuilder<Storage> {
        CacheEngineBuilder {
            name: self.name,
            namespace: self.namespace,
            default_ttl: self.default_ttl,
            codec: self.codec,
            clock: self.clock,
            telemetry: self.telemetry,
            listener: self.listener,
            #[cfg(feature = "sqlite")]
            sqlite_journal: self.sqlite_journal,
            storage: Storage(kind),
        }
    }

    /// Keeps values and metadata in a fresh process-local [`MemoryStore`].
    #[must_use]
    pub fn memory(self) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Memory(MemoryStore::new()))
    }

    /// Keeps values and metadata in `store`, shared with other engines.
    ///
    /// Engines sharing a store should use distinct namespaces; clearing one never touches the
    /// others.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage::{CacheEngine, CacheLayer, MemoryStore, Ttl};
    ///
    /// let store = MemoryStore::new();
    /// let users = CacheEngine::builder().namespace("users").memory_shared(&store).build()?;
    /// let posts = CacheEngine::builder().namespace("posts").memory_shared(&store).build()?;
    ///
    /// users.save("1", &"ada", Ttl::Default)?;
    /// posts.save("1", &"hello", Ttl::Default)?;
    /// users.clear()?;
    ///
    /// assert!(posts.has("1")?);
    /// assert_eq!(store.len(), 1);
    /// # Ok::<(), stowage::Error>(())
    /// ```
    #[must_use]
    pub fn memory_shared(self, store: &MemoryStore) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Memory(store.clone()))
    }

    /// Stores values as `<base>/<namespace>/<key>.cache` files, with metadata in the same
    /// directory laid out as `journal`.
    ///
    /// `base` must exist and be writable when the engine is built; the namespace subdirectory is
    /// created as needed.
    #[must_use]
    pub fn filesystem(self, base: impl Into<PathBuf>, journal: JournalFormat) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Filesystem {
            base: base.into(),
            journal,
        })
    }

    /// Stores values in Redis over an open connection, with metadata in a process-local journal.
    ///
    /// Combine with [`sqlite_journal`][CacheEngineBuilder::sqlite_journal] to keep metadata in a
    /// database shared by several processes.
    #[cfg(feature = "redis")]
    #[must_use]
    pub fn redis(self, conn: redis::Connection) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Redis(conn))
    }

    /// Stores nothing: every read misses and every write succeeds.
    #[must_use]
    pub fn null(self) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Null)
    }

    /// Uses an already constructed value store and journal.
    ///
    /// The builder's namespace does not apply to them; they carry their own.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[cfg(feature = "test-util")]
    /// # fn main() {
    /// use stowage::{Backend, CacheEngine, CacheLayer, Journal, MockBackend, Ttl};
    ///
    /// let mock = MockBackend::new();
    /// let engine = CacheEngine::builder()
    ///     .storage(Backend::from(mock.clone()), Journal::Null)
    ///     .build()
    ///     .expect("nothing to create");
    ///
    /// engine.save("abc", &1, Ttl::Default).expect("valid key");
    /// assert!(mock.contains_key("abc"));
    /// # }
    /// # #[cfg(not(feature = "test-util"))]
    /// # fn main() {}
    /// ```
    #[must_use]
    pub fn storage(self, backend: Backend, journal: Journal) -> CacheEngineBuilder<Storage> {
        self.with_storage(StorageKind::Custom { backend, journal })
    }
}

impl<S> CacheEngineBuilder<S> {
    /// Sets the name identifying the engine in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Scopes the engine's keys to `namespace`; the empty string selects the default namespace.
    ///
    /// The namespace follows the key syntax and is validated by [`build`][CacheEngineBuilder::build].
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the lifetime of values saved with [`Ttl::Default`][crate::Ttl::Default].
    ///
    /// Without one, such values never expire.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the value encoding; JSON by default.
    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the clock used for expirations; the system clock by default.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the telemetry configuration; everything is disabled by default.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Registers a listener for the engine's [`CacheEvent`][crate::CacheEvent]s.
    #[must_use]
    pub fn on_event(mut self, listener: impl Into<EventListener>) -> Self {
        self.listener = Some(listener.into());
        self
    }

    /// Keeps metadata in the SQLite database at `path` instead of the storage's own journal.
    ///
    /// Keys are stored namespace-qualified, so engines with different namespaces can share one
    /// database file.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_journal = Some(path.into());
        self
    }
}

impl CacheEngineBuilder<Storage> {
    /// Creates the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespace`][crate::Error::InvalidNamespace] for an illegal
    /// namespace, [`Error::InvalidDirectory`][crate::Error::InvalidDirectory] when a filesystem
    /// base directory is missing or not writable, and
    /// [`Error::InvalidConfiguration`][crate::Error::InvalidConfiguration] when a journal
    /// database cannot be opened.
    pub fn build(self) -> Result<CacheEngine> {
        let namespace = match self.namespace {
            Some(name) => Namespace::new(name)?,
            None => Namespace::default(),
        };

        let (backend, journal) = match self.storage.0 {
            StorageKind::Memory(store) => (
                Backend::from(MemoryBackend::new(store.clone(), namespace.clone())),
                Journal::from(MemoryJournal::new(store, namespace.clone())),
            ),
            StorageKind::Filesystem { base, journal } => {
                let backend = FilesystemBackend::with_namespace(base, &namespace)?;
                let journal = match journal {
                    JournalFormat::FlatFile => Journal::from(FlatFileJournal::new(backend.dir())?),
                    JournalFormat::IniFile => Journal::from(IniFileJournal::new(backend.dir())?),
                };
                (Backend::from(backend), journal)
            }
            #[cfg(feature = "redis")]
            StorageKind::Redis(conn) => (
                Backend::from(stowage_backend::RedisBackend::new(conn, namespace.clone())),
                Journal::from(MemoryJournal::new(MemoryStore::new(), namespace.clone())),
            ),
            StorageKind::Null => (Backend::Null, Journal::Null),
            StorageKind::Custom { backend, journal } => (backend, journal),
        };

        #[cfg(feature = "sqlite")]
        let journal = match self.sqlite_journal {
            Some(path) => Journal::from(SqliteJournal::open(path, namespace)?),
            None => journal,
        };

        Ok(CacheEngine {
            name: self.name,
            backend,
            journal,
            codec: self.codec,
            clock: self.clock,
            default_ttl: self.default_ttl,
            telemetry: self.telemetry.build(),
            listener: self.listener,
        })
    }
}
