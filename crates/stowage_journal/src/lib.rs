// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Expiration and tag metadata journals.
//!
//! Most value stores can hold bytes but cannot natively expire them by tag or answer "which keys
//! carry this tag". A [`Journal`] tracks that metadata next to the value store: for each key it
//! keeps a [`MetadataRecord`] (an optional absolute expiration plus a tag set) and it can list the
//! keys carrying any of a set of tags.
//!
//! Every variant follows the same contract:
//!
//! - [`Journal::set`] replaces a key's record wholesale; writing the default record is the same as
//!   never having written one.
//! - [`Journal::get`] never fails; missing or unreadable metadata reads as the default record.
//! - [`Journal::clear`] removes one key or every key in the journal's scope, and succeeds when
//!   there is nothing to remove.
//! - [`Journal::keys_by_tags`] returns each matching key once; an empty tag set matches nothing.
//!
//! # Examples
//!
//! ```
//! use stowage_journal::{Journal, MemoryJournal};
//! use stowage_tier::{MemoryStore, MetadataRecord, Namespace};
//!
//! let journal = Journal::Memory(MemoryJournal::new(MemoryStore::new(), Namespace::default()));
//!
//! journal.set("abc", &MetadataRecord::new(Some(30), ["tag1", "tag2"]))?;
//! assert_eq!(journal.get("abc").expires_at(), Some(30));
//!
//! let keys: Vec<String> = journal.keys_by_tags(&["tag2".to_string()])?.collect();
//! assert_eq!(keys, ["abc"]);
//!
//! journal.clear(Some("abc"))?;
//! assert!(journal.get("abc").is_empty());
//! # Ok::<(), stowage_tier::Error>(())
//! ```

mod flat_file;
mod ini_file;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::iter::FusedIterator;

#[doc(inline)]
pub use flat_file::FlatFileJournal;
#[doc(inline)]
pub use ini_file::IniFileJournal;
#[doc(inline)]
pub use memory::MemoryJournal;
#[cfg(feature = "sqlite")]
#[doc(inline)]
pub use sqlite::SqliteJournal;
#[doc(inline)]
pub use stowage_tier::MetadataRecord;
use stowage_tier::Result;

/// A metadata journal.
///
/// The set of variants is closed; pick one when assembling an engine.
#[derive(Debug)]
#[non_exhaustive]
pub enum Journal {
    /// Metadata stored next to values in a shared `MemoryStore`.
    Memory(MemoryJournal),
    /// One `<key>.meta` file per key.
    FlatFile(FlatFileJournal),
    /// One `journal.ini` file holding a section per key.
    IniFile(IniFileJournal),
    /// Two relational tables in a SQLite database.
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteJournal),
    /// Discards all metadata.
    Null,
}

impl Journal {
    /// Returns the record stored for `key`, or the default record.
    #[must_use]
    pub fn get(&self, key: &str) -> MetadataRecord {
        match self {
            Self::Memory(j) => j.get(key),
            Self::FlatFile(j) => j.get(key),
            Self::IniFile(j) => j.get(key),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(j) => j.get(key),
            Self::Null => MetadataRecord::default(),
        }
    }

    /// Replaces the record stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata could not be persisted.
    pub fn set(&self, key: &str, record: &MetadataRecord) -> Result<()> {
        match self {
            Self::Memory(j) => {
                j.set(key, record);
                Ok(())
            }
            Self::FlatFile(j) => j.set(key, record),
            Self::IniFile(j) => j.set(key, record),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(j) => j.set(key, record),
            Self::Null => Ok(()),
        }
    }

    /// Removes the record for `key`, or every record in scope when `key` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if existing metadata could not be removed.
    pub fn clear(&self, key: Option<&str>) -> Result<()> {
        match self {
            Self::Memory(j) => {
                j.clear(key);
                Ok(())
            }
            Self::FlatFile(j) => j.clear(key),
            Self::IniFile(j) => j.clear(key),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(j) => j.clear(key),
            Self::Null => Ok(()),
        }
    }

    /// Lists the keys carrying at least one of `tags`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal's storage could not be queried.
    pub fn keys_by_tags(&self, tags: &[String]) -> Result<TaggedKeys> {
        if tags.is_empty() {
            return Ok(TaggedKeys::default());
        }

        let keys = match self {
            Self::Memory(j) => j.keys_by_tags(tags),
            Self::FlatFile(j) => j.keys_by_tags(tags)?,
            Self::IniFile(j) => j.keys_by_tags(tags),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(j) => j.keys_by_tags(tags)?,
            Self::Null => Vec::new(),
        };

        Ok(TaggedKeys::new(keys))
    }

    /// A short name for the variant, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::FlatFile(_) => "flat_file",
            Self::IniFile(_) => "ini_file",
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "sqlite",
            Self::Null => "null",
        }
    }
}

impl From<MemoryJournal> for Journal {
    fn from(journal: MemoryJournal) -> Self {
        Self::Memory(journal)
    }
}

impl From<FlatFileJournal> for Journal {
    fn from(journal: FlatFileJournal) -> Self {
        Self::FlatFile(journal)
    }
}

impl From<IniFileJournal> for Journal {
    fn from(journal: IniFileJournal) -> Self {
        Self::IniFile(journal)
    }
}

#[cfg(feature = "sqlite")]
impl From<SqliteJournal> for Journal {
    fn from(journal: SqliteJournal) -> Self {
        Self::Sqlite(journal)
    }
}

/// Keys returned by [`Journal::keys_by_tags`], each at most once, in sorted order.
#[derive(Debug, Clone, Default)]
pub struct TaggedKeys {
    keys: std::vec::IntoIter<String>,
}

impl TaggedKeys {
    fn new(mut keys: Vec<String>) -> Self {
        keys.sort_unstable();
        keys.dedup();
        Self { keys: keys.into_iter() }
    }
}

impl Iterator for TaggedKeys {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for TaggedKeys {}

impl FusedIterator for TaggedKeys {}
