// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Direct key/value access to a cache layer.

use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage_tier::{Result, Ttl};

use crate::engine::CacheEngine;
use crate::layer::CacheLayer;

/// A key/value facade over a [`CacheLayer`].
///
/// # Examples
///
/// ```
/// use stowage::{CacheEngine, SimpleCache, Ttl};
///
/// let cache = SimpleCache::new(CacheEngine::builder().memory().build()?);
///
/// cache.set("greeting", &"hello", Ttl::Seconds(60))?;
/// assert_eq!(cache.get::<String>("greeting")?.as_deref(), Some("hello"));
/// assert_eq!(cache.get_or("missing", 5)?, 5);
///
/// cache.set_multiple(&[("a", 1), ("b", 2)], Ttl::Default)?;
/// let values = cache.get_multiple(["a", "b", "c"], 0)?;
/// assert_eq!(values, [("a".to_string(), 1), ("b".to_string(), 2), ("c".to_string(), 0)]);
/// # Ok::<(), stowage::Error>(())
/// ```
#[derive(Debug)]
pub struct SimpleCache<L = CacheEngine> {
    layer: L,
}

impl<L: CacheLayer> SimpleCache<L> {
    /// Wraps `layer`.
    pub fn new(layer: L) -> Self {
        Self { layer }
    }

    /// The wrapped layer.
    pub fn layer(&self) -> &L {
        &self.layer
    }

    /// Unwraps the layer.
    pub fn into_inner(self) -> L {
        self.layer
    }

    /// Returns the live value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        self.layer.get(key)
    }

    /// Returns the live value under `key`, or `default` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn get_or<V: DeserializeOwned>(&self, key: &str, default: V) -> Result<V> {
        Ok(self.layer.get(key)?.unwrap_or(default))
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: impl Into<Ttl>) -> Result<bool> {
        self.layer.save(key, value, ttl)
    }

    /// Stores `value` under `key` with tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] or
    /// [`Error::InvalidTag`][crate::Error::InvalidTag] for illegal input.
    pub fn set_tagged<V, I, S>(&self, key: &str, value: &V, ttl: impl Into<Ttl>, tags: I) -> Result<bool>
    where
        V: Serialize + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer.save_tagged(key, value, ttl, tags)
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.layer.delete(key)
    }

    /// Removes everything in the layer's scope.
    ///
    /// # Errors
    ///
    /// Engines never fail here; storage failures are reported as `Ok(false)`.
    pub fn clear(&self) -> Result<bool> {
        self.layer.clear()
    }

    /// Returns `true` if a live value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.layer.has(key)
    }

    /// Reads several keys, substituting a clone of `default` for each miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any read if a key is
    /// illegal.
    pub fn get_multiple<V, I, K>(&self, keys: I, default: V) -> Result<Vec<(String, V)>>
    where
        V: DeserializeOwned + Clone,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Ok(self
            .layer
            .get_many(keys)?
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_else(|| default.clone())))
            .collect())
    }

    /// Stores several values with one lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any write if a key is
    /// illegal.
    pub fn set_multiple<K, V>(&self, entries: &[(K, V)], ttl: impl Into<Ttl>) -> Result<bool>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        self.layer.save_many(entries, ttl)
    }

    /// Removes several keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any removal if a key is
    /// illegal.
    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.layer.delete_many(keys)
    }

    /// Removes every key carrying at least one of `tags`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`][crate::Error::InvalidTag] for an illegal tag.
    pub fn invalidate_tags<I, S>(&self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer.invalidate_tags(tags)
    }
}

impl<L: CacheLayer> From<L> for SimpleCache<L> {
    fn from(layer: L) -> Self {
        Self::new(layer)
    }
}
