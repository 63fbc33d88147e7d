// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Key/value caching with expiration, tags and interchangeable storage.
//!
//! A [`CacheEngine`] pairs a value store ([`Backend`]) with a metadata journal ([`Journal`]).
//! The store holds encoded values; the journal records when each key expires and which tags it
//! carries. Expired values read as misses, and [`invalidate_tags`][CacheLayer::invalidate_tags]
//! removes every key carrying a tag.
//!
//! - [`ChainEngine`] tries several engines in order for reads and writes to all of them.
//! - [`SimpleCache`] offers a get-with-default facade.
//! - [`CachePool`] offers an item facade with deferred, batched saves.
//!
//! Storage failures never surface as errors: a failed read is a miss and a failed write reports
//! `false`. Only illegal keys, tags and configuration produce an [`Error`].
//!
//! # Examples
//!
//! ## Memory cache
//!
//! ```
//! use stowage::{CacheEngine, CacheLayer, Ttl};
//!
//! let engine = CacheEngine::builder().memory().build()?;
//!
//! engine.save_tagged("user.1", &"ada", Ttl::Seconds(60), ["users"])?;
//! assert_eq!(engine.get::<String>("user.1")?.as_deref(), Some("ada"));
//!
//! engine.invalidate_tags(["users"])?;
//! assert!(!engine.has("user.1")?);
//! # Ok::<(), stowage::Error>(())
//! ```
//!
//! ## Memory in front of files
//!
//! ```
//! use stowage::{CacheEngine, CacheLayer, ChainEngine, JournalFormat, SimpleCache, Ttl};
//!
//! let dir = tempfile::tempdir()?;
//! let chain = ChainEngine::new([
//!     CacheEngine::builder().memory().build()?,
//!     CacheEngine::builder().filesystem(dir.path(), JournalFormat::FlatFile).build()?,
//! ]);
//!
//! let cache = SimpleCache::new(chain);
//! cache.set("answer", &42, Ttl::Default)?;
//! assert_eq!(cache.get_or("answer", 0)?, 42);
//! assert_eq!(cache.get_or("question", 0)?, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod chain;
mod engine;
mod events;
mod layer;
mod pool;
mod simple;
mod telemetry;

#[doc(inline)]
pub use builder::{CacheEngineBuilder, JournalFormat, Storage};
#[doc(inline)]
pub use chain::ChainEngine;
#[doc(inline)]
pub use engine::CacheEngine;
#[doc(inline)]
pub use events::{CacheEvent, EventListener};
#[doc(inline)]
pub use layer::CacheLayer;
#[doc(inline)]
pub use pool::{CacheItem, CachePool};
#[doc(inline)]
pub use simple::SimpleCache;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use stowage_backend::RedisBackend;
#[doc(inline)]
pub use stowage_backend::{Backend, FilesystemBackend, MemoryBackend};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use stowage_backend::{BackendOp, MockBackend};
#[cfg(feature = "sqlite")]
#[doc(inline)]
pub use stowage_journal::SqliteJournal;
#[doc(inline)]
pub use stowage_journal::{FlatFileJournal, IniFileJournal, Journal, MemoryJournal, TaggedKeys};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use stowage_tier::ClockControl;
#[doc(inline)]
pub use stowage_tier::{
    Clock, ClockExt, Codec, Error, KeyValidator, MemoryStore, MetadataRecord, Namespace, Result, Ttl, system_clock,
};
#[doc(inline)]
pub use telemetry::TelemetryConfig;
