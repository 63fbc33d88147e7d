// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Ordered groups of engines.

use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage_tier::{KeyValidator, Result, Ttl};

use crate::engine::CacheEngine;
use crate::layer::CacheLayer;

/// An ordered list of engines acting as one cache.
///
/// Reads probe the engines in order and return the first hit; a hit in a later engine is not
/// copied into earlier ones. Writes, deletes, clears and invalidations go to every engine, even
/// after one of them fails, and succeed only if all of them did. Keys and tags are validated
/// once before any engine is touched.
///
/// # Examples
///
/// ```
/// use stowage::{CacheEngine, CacheLayer, ChainEngine, Ttl};
///
/// let fast = CacheEngine::builder().name("fast").memory().build()?;
/// let slow = CacheEngine::builder().name("slow").memory().build()?;
/// let chain = ChainEngine::new([fast, slow]);
///
/// assert!(chain.save("abc", &7, Ttl::Default)?);
/// assert!(chain.engines().iter().all(|engine| engine.has("abc").unwrap_or(false)));
/// assert_eq!(chain.get::<i32>("abc")?, Some(7));
/// # Ok::<(), stowage::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ChainEngine {
    engines: Vec<CacheEngine>,
}

impl ChainEngine {
    /// Creates a chain probing `engines` in iteration order.
    pub fn new(engines: impl IntoIterator<Item = CacheEngine>) -> Self {
        Self {
            engines: engines.into_iter().collect(),
        }
    }

    /// Appends `engine` as the last one probed.
    pub fn push(&mut self, engine: CacheEngine) {
        self.engines.push(engine);
    }

    /// The engines in probe order.
    #[must_use]
    pub fn engines(&self) -> &[CacheEngine] {
        &self.engines
    }

    /// Returns `true` if the chain holds no engine.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Applies `op` to every engine and ANDs the outcomes.
    fn all(&self, mut op: impl FnMut(&CacheEngine) -> Result<bool>) -> Result<bool> {
        let mut ok = true;
        for engine in &self.engines {
            ok &= op(engine)?;
        }
        Ok(ok)
    }
}

impl FromIterator<CacheEngine> for ChainEngine {
    fn from_iter<I: IntoIterator<Item = CacheEngine>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl CacheLayer for ChainEngine {
    fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        KeyValidator::validate_key(key)?;
        for engine in &self.engines {
            if let Some(value) = engine.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn has(&self, key: &str) -> Result<bool> {
        KeyValidator::validate_key(key)?;
        for engine in &self.engines {
            if engine.has(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn save_tagged<V, I, S>(&self, key: &str, value: &V, ttl: impl Into<Ttl>, tags: I) -> Result<bool>
    where
        V: Serialize + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        KeyValidator::validate_key(key)?;
        KeyValidator::validate_tags(&tags)?;

        let ttl = ttl.into();
        self.all(|engine| engine.save_tagged(key, value, ttl, tags.iter().cloned()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        KeyValidator::validate_key(key)?;
        self.all(|engine| engine.delete(key))
    }

    fn clear(&self) -> Result<bool> {
        self.all(|engine| engine.clear())
    }

    fn invalidate_tags<I, S>(&self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        KeyValidator::validate_tags(&tags)?;
        self.all(|engine| engine.invalidate_tags(tags.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use stowage_backend::{Backend, BackendOp, MemoryBackend, MockBackend};
    use stowage_journal::{Journal, MemoryJournal};
    use stowage_tier::{Error, MemoryStore, Namespace};

    use super::*;

    fn memory_engine() -> CacheEngine {
        let store = MemoryStore::new();
        CacheEngine::new(
            Backend::from(MemoryBackend::new(store.clone(), Namespace::default())),
            Journal::from(MemoryJournal::new(store, Namespace::default())),
        )
    }

    fn mock_engine() -> (MockBackend, CacheEngine) {
        let mock = MockBackend::new();
        let engine = CacheEngine::new(Backend::from(mock.clone()), Journal::Null);
        (mock, engine)
    }

    #[test]
    fn first_hit_wins_without_backfill() {
        let chain = ChainEngine::new([memory_engine(), memory_engine()]);
        assert!(chain.engines()[1].save("abc", &2, Ttl::Default).expect("valid key"));

        assert_eq!(chain.get::<i32>("abc").expect("valid key"), Some(2));
        assert!(chain.has("abc").expect("valid key"));
        assert!(!chain.engines()[0].has("abc").expect("valid key"));

        assert!(chain.engines()[0].save("abc", &1, Ttl::Default).expect("valid key"));
        assert_eq!(chain.get::<i32>("abc").expect("valid key"), Some(1));
    }

    #[test]
    fn one_failing_engine_does_not_stop_the_rest() {
        let (failing, first) = mock_engine();
        let (healthy, second) = mock_engine();
        let chain = ChainEngine::new([first, second]);
        failing.fail_when(|op| matches!(op, BackendOp::Set { .. } | BackendOp::Delete(_) | BackendOp::Flush));

        assert!(!chain.save("abc", &1, Ttl::Default).expect("valid key"));
        assert!(healthy.contains_key("abc"));

        assert!(!chain.delete("abc").expect("valid key"));
        assert!(!healthy.contains_key("abc"));

        assert!(!chain.clear().expect("clear never errors"));
        assert!(healthy.operations().contains(&BackendOp::Flush));
    }

    #[test]
    fn invalid_input_touches_no_engine() {
        let (mock, engine) = mock_engine();
        let chain = ChainEngine::new([engine]);

        assert!(matches!(chain.save("a@b", &1, Ttl::Default), Err(Error::InvalidKey(_))));
        assert!(matches!(chain.invalidate_tags(["x,y"]), Err(Error::InvalidTag(_))));
        assert!(matches!(chain.get::<i32>(""), Err(Error::InvalidKey(_))));

        assert!(mock.operations().is_empty());
    }

    #[test]
    fn empty_chain_misses_and_succeeds() {
        let mut chain = ChainEngine::default();
        assert!(chain.is_empty());
        assert_eq!(chain.get::<i32>("abc").expect("valid key"), None);
        assert!(chain.save("abc", &1, Ttl::Default).expect("valid key"));

        chain.push(memory_engine());
        assert!(!chain.is_empty());
        assert!(!chain.has("abc").expect("valid key"));
    }

    #[test]
    fn invalidation_reaches_every_engine() {
        let chain: ChainEngine = [memory_engine(), memory_engine()].into_iter().collect();
        assert!(chain.save_tagged("abc", &1, Ttl::Default, ["t"]).expect("valid input"));

        assert!(chain.invalidate_tags(["t"]).expect("valid tag"));

        assert!(chain.engines().iter().all(|engine| !engine.has("abc").expect("valid key")));
    }
}
