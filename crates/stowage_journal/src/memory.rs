// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use stowage_tier::{MemoryStore, MetadataRecord, Namespace};

/// Journal storing metadata on the entries of a [`MemoryStore`].
///
/// Share the store with the memory backend so a key's value and metadata live in one entry.
#[derive(Debug, Clone)]
pub struct MemoryJournal {
    store: MemoryStore,
    namespace: Namespace,
}

impl MemoryJournal {
    /// Creates a journal over `store`, scoped to `namespace`.
    #[must_use]
    pub fn new(store: MemoryStore, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub(crate) fn get(&self, key: &str) -> MetadataRecord {
        self.store.record(&self.namespace.qualify(key))
    }

    pub(crate) fn set(&self, key: &str, record: &MetadataRecord) {
        self.store.set_record(&self.namespace.qualify(key), record.clone());
    }

    pub(crate) fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => self.store.set_record(&self.namespace.qualify(key), MetadataRecord::default()),
            None => self.store.remove_records_where(|physical| self.namespace.owns(physical)),
        }
    }

    pub(crate) fn keys_by_tags(&self, tags: &[String]) -> Vec<String> {
        self.store
            .keys_tagged_with(tags, |physical| self.namespace.owns(physical))
            .iter()
            .filter_map(|physical| self.namespace.strip(physical).map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_qualified_by_namespace() {
        let store = MemoryStore::new();
        let journal = MemoryJournal::new(store.clone(), Namespace::new("ns").expect("valid namespace"));

        journal.set("k", &MetadataRecord::expiring_at(5));

        assert_eq!(store.record("ns:k").expires_at(), Some(5));
        assert!(store.record("k").is_empty());
    }

    #[test]
    fn clear_all_only_touches_own_namespace() {
        let store = MemoryStore::new();
        let default = MemoryJournal::new(store.clone(), Namespace::default());
        let named = MemoryJournal::new(store, Namespace::new("ns").expect("valid namespace"));

        default.set("k", &MetadataRecord::new(None, ["t"]));
        named.set("k", &MetadataRecord::new(None, ["t"]));

        default.clear(None);

        assert!(default.get("k").is_empty());
        assert_eq!(named.keys_by_tags(&["t".to_string()]), ["k"]);
    }
}
