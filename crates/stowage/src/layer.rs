// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The operations shared by engines and chains.

use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage_tier::{KeyValidator, Result, Ttl};

/// A cache unit: a single [`CacheEngine`][crate::CacheEngine] or a
/// [`ChainEngine`][crate::ChainEngine] of them.
///
/// Every method validates its keys and tags before touching storage and fails with
/// [`Error::InvalidKey`][crate::Error::InvalidKey] or [`Error::InvalidTag`][crate::Error::InvalidTag]
/// when they are illegal. Storage failures never surface as errors; mutations report them as
/// `Ok(false)` and reads as a miss.
///
/// The front ends [`SimpleCache`][crate::SimpleCache] and [`CachePool`][crate::CachePool] work over
/// any layer.
pub trait CacheLayer {
    /// Returns the live value stored under `key`.
    ///
    /// A value that is absent, expired, unreadable or not decodable as `V` is a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned;

    /// Returns `true` if a value is stored under `key` and has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    fn has(&self, key: &str) -> Result<bool>;

    /// Stores `value` under `key` with the given lifetime and tags.
    ///
    /// A TTL resolving to a negative number of seconds skips the save and reports success; a TTL
    /// of zero stores a value that is already expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] or
    /// [`Error::InvalidTag`][crate::Error::InvalidTag] for illegal input.
    fn save_tagged<V, I, S>(&self, key: &str, value: &V, ttl: impl Into<Ttl>, tags: I) -> Result<bool>
    where
        V: Serialize + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>;

    /// Removes the value and metadata stored under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every value and metadata record in the layer's namespace scope.
    ///
    /// # Errors
    ///
    /// Engines never fail here; storage failures are reported as `Ok(false)`.
    fn clear(&self) -> Result<bool>;

    /// Removes every key carrying at least one of `tags`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`][crate::Error::InvalidTag] for an illegal tag.
    fn invalidate_tags<I, S>(&self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    /// Stores `value` under `key` without tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] for an illegal key.
    fn save<V>(&self, key: &str, value: &V, ttl: impl Into<Ttl>) -> Result<bool>
    where
        V: Serialize + ?Sized,
    {
        self.save_tagged(key, value, ttl, std::iter::empty::<String>())
    }

    /// Reads several keys, returning each key with its value or `None`, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any read if a key is
    /// illegal.
    fn get_many<V, I, K>(&self, keys: I) -> Result<Vec<(String, Option<V>)>>
    where
        V: DeserializeOwned,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        KeyValidator::validate_keys(&keys)?;

        keys.iter()
            .map(|key| {
                let key = key.as_ref();
                Ok((key.to_string(), self.get(key)?))
            })
            .collect()
    }

    /// Stores several values with one lifetime; `Ok(true)` only if every save succeeded.
    ///
    /// Every save is attempted even after one fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any write if a key is
    /// illegal.
    fn save_many<K, V>(&self, entries: &[(K, V)], ttl: impl Into<Ttl>) -> Result<bool>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        KeyValidator::validate_keys(entries.iter().map(|(key, _)| key))?;

        let ttl = ttl.into();
        let mut saved = true;
        for (key, value) in entries {
            saved &= self.save(key.as_ref(), value, ttl)?;
        }
        Ok(saved)
    }

    /// Removes several keys; `Ok(true)` only if every removal succeeded.
    ///
    /// Every removal is attempted even after one fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`][crate::Error::InvalidKey] before any removal if a key is
    /// illegal.
    fn delete_many<I, K>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        KeyValidator::validate_keys(&keys)?;

        let mut deleted = true;
        for key in &keys {
            deleted &= self.delete(key.as_ref())?;
        }
        Ok(deleted)
    }
}
