// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock value store for testing.
//!
//! This module provides [`MockBackend`], an in-memory store that records every operation and
//! can be told to fail selected operations, so engines' partial-failure paths can be exercised.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stowage_tier::{Error, Result};

/// Recorded backend operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    /// A value was read.
    Get(String),
    /// A value was written.
    Set {
        /// The key written.
        key: String,
        /// The bytes written.
        value: Vec<u8>,
        /// The native TTL hint passed along.
        native_ttl: Option<Duration>,
    },
    /// A value was deleted.
    Delete(String),
    /// A value's presence was checked.
    Exists(String),
    /// The store was flushed.
    Flush,
}

impl BackendOp {
    /// The key the operation targeted, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Get(key) | Self::Delete(key) | Self::Exists(key) | Self::Set { key, .. } => Some(key.as_str()),
            Self::Flush => None,
        }
    }
}

type FailPredicate = Box<dyn Fn(&BackendOp) -> bool + Send + Sync>;

/// A recording value store with failure injection.
///
/// Clones share data, the operation log and the failure predicate, so a test can keep a handle
/// after moving the backend into an engine.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() {
/// use stowage_backend::{Backend, BackendOp, MockBackend};
///
/// let mock = MockBackend::new();
/// let backend = Backend::from(mock.clone());
///
/// mock.fail_when(|op| matches!(op, BackendOp::Set { key, .. } if key == "forbidden"));
///
/// assert!(backend.set("allowed", b"1", None).is_ok());
/// assert!(backend.set("forbidden", b"1", None).is_err());
/// assert_eq!(mock.operations().len(), 2);
/// # }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    operations: Arc<Mutex<Vec<BackendOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl MockBackend {
    /// Creates an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a predicate deciding which operations fail.
    ///
    /// Failing operations are still recorded but leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&BackendOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a copy of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<BackendOp> {
        self.operations.lock().clone()
    }

    /// Clears the operation log.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Records `op` and returns an error if the failure predicate matches it.
    fn check(&self, op: BackendOp) -> Result<()> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let error = fail.then(|| Error::storage(format!("mock: {op:?} failed")));
        self.operations.lock().push(op);
        error.map_or(Ok(()), Err)
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check(BackendOp::Get(key.to_string()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    pub(crate) fn set(&self, key: &str, value: &[u8], native_ttl: Option<Duration>) -> Result<()> {
        self.check(BackendOp::Set {
            key: key.to_string(),
            value: value.to_vec(),
            native_ttl,
        })?;
        self.data.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        self.check(BackendOp::Delete(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    pub(crate) fn exists(&self, key: &str) -> Result<bool> {
        self.check(BackendOp::Exists(key.to_string()))?;
        Ok(self.data.lock().contains_key(key))
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.check(BackendOp::Flush)?;
        self.data.lock().clear();
        Ok(())
    }
}
