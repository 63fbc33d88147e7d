// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Item-oriented access to a cache layer, with deferred saves.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage_tier::{KeyValidator, Result, Ttl};

use crate::engine::CacheEngine;
use crate::layer::CacheLayer;

/// A cache entry as seen through a [`CachePool`].
///
/// Items returned by [`CachePool::get_item`] know whether they were a hit. New values, lifetimes
/// and tags are set on the item and take effect when it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem<V> {
    key: String,
    value: Option<V>,
    hit: bool,
    expiry: Ttl,
    tags: Vec<String>,
}

impl<V> CacheItem<V> {
    /// Creates an empty item for `key`, as returned on a miss.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            hit: false,
            expiry: Ttl::Default,
            tags: Vec::new(),
        }
    }

    fn hit(key: impl Into<String>, value: V) -> Self {
        Self {
            value: Some(value),
            hit: true,
            ..Self::new(key)
        }
    }

    /// The item's key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached value; `None` unless the item was a hit.
    #[must_use]
    pub fn get(&self) -> Option<&V> {
        self.value.as_ref().filter(|_| self.hit)
    }

    /// Returns `true` if the item was found in the cache when it was read.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// The value that a save would store, whether it was read or set.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Consumes the item, returning the value that a save would store.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        self.value
    }

    /// Sets the value to store.
    pub fn set(&mut self, value: V) -> &mut Self {
        self.value = Some(value);
        self
    }

    /// Expires the item at `epoch_seconds`; `None` restores the engine's default lifetime.
    pub fn expires_at(&mut self, epoch_seconds: Option<i64>) -> &mut Self {
        self.expiry = epoch_seconds.map_or(Ttl::Default, Ttl::At);
        self
    }

    /// Expires the item after `ttl`, e.g. a number of seconds or a [`Duration`][std::time::Duration].
    ///
    /// Passing `None::<i64>` or [`Ttl::Default`] restores the engine's default lifetime.
    pub fn expires_after(&mut self, ttl: impl Into<Ttl>) -> &mut Self {
        self.expiry = ttl.into();
        self
    }

    /// The lifetime a save would use.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.expiry
    }

    /// The tags a save would attach.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Replaces the tags to attach.
    pub fn set_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

type DeferredSave<L> = Box<dyn FnOnce(&L) -> Result<bool> + Send>;

/// An item-oriented facade over a [`CacheLayer`].
///
/// Besides immediate saves, items can be queued with [`save_deferred`][Self::save_deferred] and
/// written together by [`commit`][Self::commit]. The queue holds at most one item per key; a
/// later deferral replaces the earlier one in place. Dropping the pool discards the queue.
///
/// # Examples
///
/// ```
/// use stowage::{CacheEngine, CacheItem, CachePool};
///
/// let pool = CachePool::new(CacheEngine::builder().memory().build()?);
///
/// let mut item = CacheItem::new("counter");
/// item.set(1).expires_after(60_i64).set_tags(["counters"]);
/// pool.save_deferred(item)?;
/// assert!(!pool.has_item("counter")?);
///
/// assert!(pool.commit());
/// let item = pool.get_item::<i32>("counter")?;
/// assert!(item.is_hit());
/// assert_eq!(item.get(), Some(&1));
/// # Ok::<(), stowage::Error>(())
/// ```
pub struct CachePool<L = CacheEngine> {
    layer: L,
    deferred: Mutex<Vec<(String, DeferredSave<L>)>>,
}

impl<L: CacheLayer> CachePool<L> {
    /// Wraps `layer` with an empty deferred queue.
    pub fn new(layer: L) -> Self {
        Self {
            layer,
            deferred: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped layer.
    pub fn layer(&self) -> &L {
        &self.layer
    }

    /// Reads `key` into an item; a miss yields an empty item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn get_item<V: DeserializeOwned>(&self, key: &str) -> Result<CacheItem<V>> {
        Ok(match self.layer.get(key)? {
            Some(value) => CacheItem::hit(key, value),
            None => CacheItem::new(key),
        })
    }

    /// Reads several keys into items, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any read if a key is
    /// illegal.
    pub fn get_items<V, I, K>(&self, keys: I) -> Result<Vec<CacheItem<V>>>
    where
        V: DeserializeOwned,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Ok(self
            .layer
            .get_many(keys)?
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => CacheItem::hit(key, value),
                None => CacheItem::new(key),
            })
            .collect())
    }

    /// Returns `true` if a live value is stored under `key`.
    ///
    /// Deferred items are not visible until committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn has_item(&self, key: &str) -> Result<bool> {
        self.layer.has(key)
    }

    /// Discards the deferred queue and clears the layer.
    ///
    /// # Errors
    ///
    /// Engines never fail here; storage failures are reported as `Ok(false)`.
    pub fn clear(&self) -> Result<bool> {
        self.deferred.lock().clear();
        self.layer.clear()
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    pub fn delete_item(&self, key: &str) -> Result<bool> {
        self.layer.delete(key)
    }

    /// Removes several keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any removal if a key is
    /// illegal.
    pub fn delete_items<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.layer.delete_many(keys)
    }

    /// Writes `item` now. An item without a value is not saved and yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] or
    /// [`Error::InvalidTag`][crate::Error::InvalidTag] for illegal input.
    pub fn save<V: Serialize>(&self, item: &CacheItem<V>) -> Result<bool> {
        save_item(&self.layer, item)
    }

    /// Queues `item` until the next [`commit`][Self::commit].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] or
    /// [`Error::InvalidTag`][crate::Error::InvalidTag] for illegal input; the item is not queued.
    pub fn save_deferred<V>(&self, item: CacheItem<V>) -> Result<bool>
    where
        V: Serialize + Send + 'static,
    {
        KeyValidator::validate_key(&item.key)?;
        KeyValidator::validate_tags(&item.tags)?;

        let key = item.key.clone();
        let save: DeferredSave<L> = Box::new(move |layer: &L| save_item(layer, &item));

        let mut deferred = self.deferred.lock();
        match deferred.iter_mut().find(|(queued, _)| *queued == key) {
            Some(slot) => slot.1 = save,
            None => deferred.push((key, save)),
        }
        Ok(true)
    }

    /// Writes every deferred item and empties the queue.
    ///
    /// Returns `true` only if every queued save succeeded; all of them are attempted.
    pub fn commit(&self) -> bool {
        let pending = std::mem::take(&mut *self.deferred.lock());

        let mut committed = true;
        for (_, save) in pending {
            committed &= matches!(save(&self.layer), Ok(true));
        }
        committed
    }

    /// The keys waiting in the deferred queue, in queue order.
    #[must_use]
    pub fn deferred_keys(&self) -> Vec<String> {
        self.deferred.lock().iter().map(|(key, _)| key.clone()).collect()
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

fn save_item<L: CacheLayer, V: Serialize>(layer: &L, item: &CacheItem<V>) -> Result<bool> {
    match &item.value {
        Some(value) => layer.save_tagged(&item.key, value, item.expiry, item.tags.iter().cloned()),
        None => {
            KeyValidator::validate_key(&item.key)?;
            Ok(false)
        }
    }
}

impl<L: fmt::Debug> fmt::Debug for CachePool<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deferred: Vec<String> = self.deferred.lock().iter().map(|(key, _)| key.clone()).collect();
        f.debug_struct("CachePool")
            .field("layer", &self.layer)
            .field("deferred", &deferred)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    static_assertions::assert_impl_all!(CachePool: Send, Sync);

    #[test]
    fn new_item_is_a_miss() {
        let item = CacheItem::<i32>::new("abc");
        assert_eq!(item.key(), "abc");
        assert!(!item.is_hit());
        assert_eq!(item.get(), None);
        assert_eq!(item.ttl(), Ttl::Default);
        assert!(item.tags().is_empty());
    }

    #[test]
    fn set_value_is_hidden_until_read_back() {
        let mut item = CacheItem::new("abc");
        item.set(5);

        assert_eq!(item.get(), None);
        assert_eq!(item.value(), Some(&5));
        assert_eq!(item.into_value(), Some(5));
    }

    #[test]
    fn expiry_setters_map_to_ttl() {
        let mut item = CacheItem::<i32>::new("abc");

        item.expires_at(Some(1_234));
        assert_eq!(item.ttl(), Ttl::At(1_234));

        item.expires_after(Duration::from_secs(5));
        assert_eq!(item.ttl(), Ttl::Duration(Duration::from_secs(5)));

        item.expires_after(None::<i64>);
        assert_eq!(item.ttl(), Ttl::Default);

        item.expires_after(30_i64).expires_at(None);
        assert_eq!(item.ttl(), Ttl::Default);
    }

    #[test]
    fn hit_exposes_value() {
        let item = CacheItem::hit("abc", "v".to_string());
        assert!(item.is_hit());
        assert_eq!(item.get().map(String::as_str), Some("v"));
    }
}
