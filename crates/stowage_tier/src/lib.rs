// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core types for building stowage cache engines.
//!
//! This crate holds the vocabulary shared by the metadata journals (`stowage_journal`), the value
//! stores (`stowage_backend`) and the engines built on top of them (`stowage`):
//!
//! - [`Error`] and [`Result`] for every fallible operation;
//! - [`KeyValidator`] for cache key and tag syntax;
//! - [`Namespace`] for scoping keys of one logical cache inside a shared store;
//! - [`MetadataRecord`] for the expiration and tag data tracked per key;
//! - [`Ttl`], [`ClockExt`] (epoch seconds from a `tick` [`Clock`]) and [`Codec`] for time and
//!   value encoding;
//! - [`MemoryStore`], the process-local map shared by the memory backend and memory journal.
//!
//! # Example
//!
//! ```
//! use stowage_tier::{KeyValidator, MetadataRecord, Namespace};
//!
//! KeyValidator::validate_key("user.42")?;
//!
//! let namespace = Namespace::new("sessions")?;
//! assert_eq!(namespace.qualify("user.42"), "sessions:user.42");
//!
//! let record = MetadataRecord::new(Some(1_700_000_000), ["users"]);
//! assert!(record.has_any_tag(&["users".to_string()]));
//! # Ok::<(), stowage_tier::Error>(())
//! ```

mod clock;
mod codec;
pub mod error;
pub mod fs;
mod key;
mod memory;
mod namespace;
mod record;
mod ttl;

#[doc(inline)]
pub use clock::{ClockExt, system_clock};
#[doc(no_inline)]
pub use tick::Clock;
#[cfg(any(feature = "test-util", test))]
#[doc(no_inline)]
pub use tick::ClockControl;
#[doc(inline)]
pub use codec::Codec;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use key::{KeyValidator, MAX_KEY_LENGTH, RESERVED_CHARACTERS};
#[doc(inline)]
pub use memory::MemoryStore;
#[doc(inline)]
pub use namespace::Namespace;
#[doc(inline)]
pub use record::MetadataRecord;
#[doc(inline)]
pub use ttl::Ttl;
