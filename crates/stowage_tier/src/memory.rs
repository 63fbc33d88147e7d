// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use dashmap::DashMap;

use crate::MetadataRecord;

#[derive(Debug, Clone, Default)]
struct MemoryEntry {
    value: Option<Vec<u8>>,
    record: MetadataRecord,
}

impl MemoryEntry {
    fn is_vacant(&self) -> bool {
        self.value.is_none() && self.record.is_empty()
    }
}

/// Process-local storage for cached values together with their metadata.
///
/// The memory backend and the memory journal are two views over the same store: one reads and
/// writes the value half of each entry, the other the [`MetadataRecord`] half. An entry disappears
/// once it holds neither a value nor a non-default record.
///
/// Keys are physical keys; callers apply their [`Namespace`][crate::Namespace] before calling.
/// Cloning the store is cheap and yields another handle to the same entries.
///
/// # Examples
///
/// ```
/// use stowage_tier::{MemoryStore, MetadataRecord};
///
/// let store = MemoryStore::new();
/// store.set_value("k", b"v".to_vec());
/// store.set_record("k", MetadataRecord::expiring_at(10));
///
/// assert_eq!(store.value("k").as_deref(), Some(&b"v"[..]));
/// assert_eq!(store.record("k").expires_at(), Some(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).and_then(|entry| entry.value.clone())
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains_value(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.value.is_some())
    }

    /// Stores a value, keeping the entry's metadata.
    pub fn set_value(&self, key: &str, value: Vec<u8>) {
        self.entries.entry(key.to_string()).or_default().value = Some(value);
    }

    /// Removes a value, keeping the entry's metadata.
    pub fn remove_value(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.value = None;
        }
        self.prune(key);
    }

    /// Returns the metadata stored under `key`, or the default record.
    #[must_use]
    pub fn record(&self, key: &str) -> MetadataRecord {
        self.entries.get(key).map(|entry| entry.record.clone()).unwrap_or_default()
    }

    /// Replaces the metadata stored under `key`.
    pub fn set_record(&self, key: &str, record: MetadataRecord) {
        if record.is_empty() {
            if let Some(mut entry) = self.entries.get_mut(key) {
                entry.record = record;
            }
            self.prune(key);
        } else {
            self.entries.entry(key.to_string()).or_default().record = record;
        }
    }

    /// Removes every value whose key matches `owned`.
    pub fn remove_values_where(&self, owned: impl Fn(&str) -> bool) {
        self.entries.retain(|key, entry| {
            if owned(key) {
                entry.value = None;
            }
            !entry.is_vacant()
        });
    }

    /// Resets the metadata of every key matching `owned`.
    pub fn remove_records_where(&self, owned: impl Fn(&str) -> bool) {
        self.entries.retain(|key, entry| {
            if owned(key) {
                entry.record = MetadataRecord::default();
            }
            !entry.is_vacant()
        });
    }

    /// Returns the keys matching `owned` whose metadata carries any of `tags`.
    #[must_use]
    pub fn keys_tagged_with(&self, tags: &[String], owned: impl Fn(&str) -> bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| owned(entry.key()) && entry.record.has_any_tag(tags))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Counts the stored values whose key matches `owned`.
    #[must_use]
    pub fn count_values_where(&self, owned: impl Fn(&str) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value.is_some() && owned(entry.key()))
            .count()
    }

    /// Returns the number of entries, with or without a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.is_vacant());
    }
}
