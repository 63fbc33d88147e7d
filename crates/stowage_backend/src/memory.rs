// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use stowage_tier::{MemoryStore, Namespace};

/// Value store over the value half of a [`MemoryStore`].
///
/// Share the store with a `MemoryJournal` so each key's value and metadata live in one entry.
/// Keys are stored as `<namespace>:<key>`.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: MemoryStore,
    namespace: Namespace,
}

impl MemoryBackend {
    /// Creates a backend over `store`, scoped to `namespace`.
    #[must_use]
    pub fn new(store: MemoryStore, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.store.value(&self.namespace.qualify(key))
    }

    pub(crate) fn set(&self, key: &str, value: &[u8]) {
        self.store.set_value(&self.namespace.qualify(key), value.to_vec());
    }

    pub(crate) fn delete(&self, key: &str) {
        self.store.remove_value(&self.namespace.qualify(key));
    }

    pub(crate) fn exists(&self, key: &str) -> bool {
        self.store.contains_value(&self.namespace.qualify(key))
    }

    pub(crate) fn flush(&self) {
        self.store.remove_values_where(|physical| self.namespace.owns(physical));
    }

    pub(crate) fn len(&self) -> u64 {
        let count = self.store.count_values_where(|physical| self.namespace.owns(physical));
        u64::try_from(count).unwrap_or(u64::MAX)
    }
}
