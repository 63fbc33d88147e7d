// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The single-store cache engine.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use stowage_backend::Backend;
use stowage_journal::Journal;
use stowage_tier::{ClockExt, Codec, Error, KeyValidator, MetadataRecord, Result, Ttl, system_clock};
use tick::Clock;

use crate::builder::CacheEngineBuilder;
use crate::events::{CacheEvent, EventListener};
use crate::layer::CacheLayer;
use crate::telemetry::ext::timed;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};

pub(crate) const DEFAULT_NAME: &str = "stowage";

/// A cache over one value store and one metadata journal.
///
/// The [`Backend`] holds encoded values; the [`Journal`] tracks each key's expiration and tags.
/// A save writes the value first and the metadata second, and only reports success when both
/// writes succeed. A delete removes the value first and keeps the metadata when that fails, so an
/// expired value never comes back as a non-expiring one. Reads treat a value whose metadata has
/// expired as a miss without removing it.
///
/// Storage failures are never returned as errors: mutations report `Ok(false)`, reads report a
/// miss, and the failure is recorded through telemetry. Only illegal keys and tags are errors.
///
/// # Examples
///
/// ```
/// use stowage::{CacheEngine, CacheLayer, Ttl};
///
/// let engine = CacheEngine::builder().memory().build()?;
///
/// engine.save_tagged("user.42", "Ada", Ttl::Seconds(60), ["users"])?;
/// assert_eq!(engine.get::<String>("user.42")?.as_deref(), Some("Ada"));
///
/// engine.invalidate_tags(["users"])?;
/// assert!(!engine.has("user.42")?);
/// # Ok::<(), stowage::Error>(())
/// ```
#[derive(Debug)]
pub struct CacheEngine {
    pub(crate) name: &'static str,
    pub(crate) backend: Backend,
    pub(crate) journal: Journal,
    pub(crate) codec: Codec,
    pub(crate) clock: Clock,
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) telemetry: CacheTelemetry,
    pub(crate) listener: Option<EventListener>,
}

enum Lookup<V> {
    Hit(V),
    Miss,
    Expired,
    Failed(Error),
}

impl CacheEngine {
    /// Creates an engine over already constructed storage, with JSON values, the system clock,
    /// no default TTL and telemetry disabled.
    ///
    /// Use [`CacheEngine::builder`] to configure anything else.
    #[must_use]
    pub fn new(backend: Backend, journal: Journal) -> Self {
        Self {
            name: DEFAULT_NAME,
            backend,
            journal,
            codec: Codec::default(),
            clock: system_clock(),
            default_ttl: None,
            telemetry: CacheTelemetry::default(),
            listener: None,
        }
    }

    /// Starts configuring an engine.
    #[must_use]
    pub fn builder() -> CacheEngineBuilder {
        CacheEngineBuilder::new()
    }

    /// The name identifying this engine in telemetry.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The value store.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The metadata journal.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The codec values are encoded with.
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// The clock used to compute and check expirations.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The lifetime used for saves with [`Ttl::Default`]; `None` means values never expire.
    #[must_use]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    fn lookup<V: DeserializeOwned>(&self, key: &str) -> Lookup<V> {
        let bytes = match self.backend.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Lookup::Miss,
            Err(e) => return Lookup::Failed(e),
        };

        if self.journal.get(key).is_expired_at(self.clock.epoch_seconds()) {
            return Lookup::Expired;
        }

        match self.codec.decode(&bytes) {
            Ok(value) => Lookup::Hit(value),
            Err(e) => Lookup::Failed(e),
        }
    }

    fn write<V>(&self, key: &str, value: &V, ttl: Option<i64>, now: i64, tags: &[String]) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let bytes = self.codec.encode(value)?;
        let native_ttl = ttl
            .filter(|secs| *secs > 0)
            .and_then(|secs| u64::try_from(secs).ok())
            .map(Duration::from_secs);

        self.backend.set(key, &bytes, native_ttl)?;

        let expires_at = ttl.map(|secs| now.saturating_add(secs));
        self.journal.set(key, &MetadataRecord::new(expires_at, tags)).inspect_err(|_| {
            // A value without its record would never expire.
            _ = self.backend.delete(key);
        })
    }

    /// Removes an already validated key, recording the outcome.
    fn remove(&self, key: &str) -> bool {
        let timed = timed(|| self.backend.delete(key).and_then(|()| self.journal.clear(Some(key))));
        match timed.result {
            Ok(()) => {
                self.record(CacheOperation::Delete, CacheActivity::Deleted, timed.duration, None);
                self.record_size();
                self.notify(|| CacheEvent::Delete { key: key.to_string() });
                true
            }
            Err(e) => {
                self.record(CacheOperation::Delete, CacheActivity::Error, timed.duration, Some(&e));
                false
            }
        }
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity, duration: Duration, error: Option<&Error>) {
        self.telemetry.record(self.name, operation, activity, duration, error);
    }

    fn record_size(&self) {
        self.telemetry.record_size(self.name, || self.backend.len());
    }

    fn notify(&self, event: impl FnOnce() -> CacheEvent) {
        if let Some(listener) = &self.listener {
            listener.notify(&event());
        }
    }
}

impl CacheLayer for CacheEngine {
    fn get<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        KeyValidator::validate_key(key)?;

        let timed = timed(|| self.lookup::<V>(key));
        let (activity, error, value) = match timed.result {
            Lookup::Hit(value) => (CacheActivity::Hit, None, Some(value)),
            Lookup::Miss => (CacheActivity::Miss, None, None),
            Lookup::Expired => (CacheActivity::Expired, None, None),
            Lookup::Failed(e) => (CacheActivity::Error, Some(e), None),
        };

        self.record(CacheOperation::Get, activity, timed.duration, error.as_ref());
        self.notify(|| {
            let key = key.to_string();
            if value.is_some() {
                CacheEvent::Hit { key }
            } else {
                CacheEvent::Miss { key }
            }
        });

        Ok(value)
    }

    fn has(&self, key: &str) -> Result<bool> {
        KeyValidator::validate_key(key)?;

        let timed = timed(|| {
            self.backend
                .exists(key)
                .map(|exists| exists && !self.journal.get(key).is_expired_at(self.clock.epoch_seconds()))
        });

        match timed.result {
            Ok(found) => {
                let activity = if found { CacheActivity::Hit } else { CacheActivity::Miss };
                self.record(CacheOperation::Has, activity, timed.duration, None);
                Ok(found)
            }
            Err(e) => {
                self.record(CacheOperation::Has, CacheActivity::Error, timed.duration, Some(&e));
                Ok(false)
            }
        }
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

        let now = self.clock.epoch_seconds();
        let ttl = ttl.into().resolve(self.default_ttl, now);
        if ttl.is_some_and(|secs| secs < 0) {
            self.record(CacheOperation::Save, CacheActivity::Skipped, Duration::ZERO, None);
            return Ok(true);
        }

        let timed = timed(|| self.write(key, value, ttl, now, &tags));
        match timed.result {
            Ok(()) => {
                self.record(CacheOperation::Save, CacheActivity::Saved, timed.duration, None);
                self.record_size();
                self.notify(|| CacheEvent::Save { key: key.to_string() });
                Ok(true)
            }
            Err(e) => {
                self.record(CacheOperation::Save, CacheActivity::Error, timed.duration, Some(&e));
                Ok(false)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        KeyValidator::validate_key(key)?;
        Ok(self.remove(key))
    }

    fn clear(&self) -> Result<bool> {
        let timed = timed(|| self.backend.flush().and_then(|()| self.journal.clear(None)));
        match timed.result {
            Ok(()) => {
                self.record(CacheOperation::Clear, CacheActivity::Ok, timed.duration, None);
                self.record_size();
                self.notify(|| CacheEvent::Clear);
                Ok(true)
            }
            Err(e) => {
                self.record(CacheOperation::Clear, CacheActivity::Error, timed.duration, Some(&e));
                Ok(false)
            }
        }
    }

    fn invalidate_tags<I, S>(&self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        KeyValidator::validate_tags(&tags)?;

        let timed = timed(|| self.journal.keys_by_tags(&tags));
        let keys = match timed.result {
            Ok(keys) => keys,
            Err(e) => {
                self.record(CacheOperation::InvalidateTags, CacheActivity::Error, timed.duration, Some(&e));
                return Ok(false);
            }
        };

        let mut invalidated = true;
        for key in keys {
            invalidated &= self.remove(&key);
        }

        let activity = if invalidated {
            CacheActivity::Invalidated
        } else {
            CacheActivity::Error
        };
        self.record(CacheOperation::InvalidateTags, activity, timed.duration, None);
        Ok(invalidated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use stowage_backend::{BackendOp, MemoryBackend, MockBackend};
    use stowage_journal::{FlatFileJournal, MemoryJournal};
    use stowage_tier::{ClockControl, MemoryStore, Namespace};

    use super::*;
    use crate::TelemetryConfig;
    use crate::telemetry::attributes;
    use crate::telemetry::testing::{LogCapture, MetricTester};

    static_assertions::assert_impl_all!(CacheEngine: Send, Sync, std::fmt::Debug);

    fn memory_journal() -> Journal {
        Journal::from(MemoryJournal::new(MemoryStore::new(), Namespace::default()))
    }

    fn mock_engine(control: &ClockControl) -> (MockBackend, CacheEngine) {
        let mock = MockBackend::new();
        let mut engine = CacheEngine::new(Backend::from(mock.clone()), memory_journal());
        engine.clock = control.to_clock();
        (mock, engine)
    }

    #[test]
    fn new_uses_defaults() {
        let engine = CacheEngine::new(Backend::Null, Journal::Null);
        assert_eq!(engine.name(), DEFAULT_NAME);
        assert_eq!(engine.codec(), Codec::Json);
        assert_eq!(engine.default_ttl(), None);
        assert_eq!(engine.backend().kind(), "null");
        assert_eq!(engine.journal().kind(), "null");
    }

    #[test]
    fn positive_ttl_is_passed_as_native_hint() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);

        assert!(engine.save("a", &1, Ttl::Seconds(30)).expect("valid key"));
        assert!(engine.save("b", &1, Ttl::Seconds(0)).expect("valid key"));
        assert!(engine.save("c", &1, Ttl::Default).expect("valid key"));

        let hints: Vec<_> = mock
            .operations()
            .into_iter()
            .filter_map(|op| match op {
                BackendOp::Set { key, native_ttl, .. } => Some((key, native_ttl)),
                _ => None,
            })
            .collect();
        assert_eq!(
            hints,
            [
                ("a".to_string(), Some(Duration::from_secs(30))),
                ("b".to_string(), None),
                ("c".to_string(), None),
            ]
        );
        assert_eq!(engine.journal().get("a").expires_at(), Some(1_030));
        assert_eq!(engine.journal().get("b").expires_at(), Some(1_000));
        assert_eq!(engine.journal().get("c").expires_at(), None);
    }

    #[test]
    fn failed_journal_write_rolls_back_the_value() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let journal_dir = dir.path().join("journal");
        std::fs::create_dir(&journal_dir).expect("create journal dir");

        let mock = MockBackend::new();
        let mut engine = CacheEngine::new(
            Backend::from(mock.clone()),
            Journal::from(FlatFileJournal::new(&journal_dir).expect("dir is writable")),
        );
        engine.clock = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)).to_clock();
        assert!(engine.save("abc", &1, Ttl::Seconds(10)).expect("valid key"));

        std::fs::remove_dir_all(&journal_dir).expect("remove journal dir");
        mock.clear_operations();

        assert!(!engine.save("abc", &2, Ttl::Seconds(10)).expect("valid key"));
        assert!(!engine.save("fresh", &3, Ttl::Seconds(10)).expect("valid key"));

        let deleted: Vec<_> = mock
            .operations()
            .into_iter()
            .filter_map(|op| match op {
                BackendOp::Delete(key) => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, ["abc", "fresh"]);
        assert!(!mock.contains_key("abc"));
        assert!(!mock.contains_key("fresh"));
        assert_eq!(engine.get::<i32>("abc").expect("valid key"), None);
        assert!(!engine.has("fresh").expect("valid key"));
    }

    #[test]
    fn failed_value_write_leaves_journal_untouched() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);
        assert!(engine.save_tagged("abc", &1, Ttl::Seconds(60), ["t"]).expect("valid input"));

        mock.fail_when(|op| matches!(op, BackendOp::Set { .. }));

        assert!(!engine.save_tagged("abc", &2, Ttl::Seconds(5), ["other"]).expect("valid input"));
        assert_eq!(engine.journal().get("abc"), MetadataRecord::new(Some(1_060), ["t"]));
        assert_eq!(engine.get::<i32>("abc").expect("valid key"), Some(1));
    }

    #[test]
    fn failed_value_delete_keeps_metadata() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);
        assert!(engine.save("abc", &1, Ttl::Seconds(10)).expect("valid key"));

        mock.fail_when(|op| matches!(op, BackendOp::Delete(_)));

        assert!(!engine.delete("abc").expect("valid key"));
        assert_eq!(engine.journal().get("abc").expires_at(), Some(1_010));

        control.advance(Duration::from_secs(10));
        assert!(!engine.has("abc").expect("valid key"));
    }

    #[test]
    fn failed_flush_reports_false_and_keeps_metadata() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);
        assert!(engine.save_tagged("abc", &1, Ttl::Seconds(10), ["t"]).expect("valid input"));

        mock.fail_when(|op| matches!(op, BackendOp::Flush));

        assert!(!engine.clear().expect("clear never errors"));
        assert!(!engine.journal().get("abc").is_empty());
    }

    #[test]
    fn read_failure_is_a_miss() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);
        assert!(engine.save("abc", &1, Ttl::Default).expect("valid key"));

        mock.fail_when(|op| matches!(op, BackendOp::Get(_) | BackendOp::Exists(_)));

        assert_eq!(engine.get::<i32>("abc").expect("valid key"), None);
        assert!(!engine.has("abc").expect("valid key"));
    }

    #[test]
    fn invalidation_attempts_every_key() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);
        for key in ["a", "b", "c"] {
            assert!(engine.save_tagged(key, &1, Ttl::Default, ["t"]).expect("valid input"));
        }

        mock.fail_when(|op| *op == BackendOp::Delete("a".to_string()));

        assert!(!engine.invalidate_tags(["t"]).expect("valid tag"));
        assert!(mock.contains_key("a"));
        assert!(!mock.contains_key("b"));
        assert!(!mock.contains_key("c"));
    }

    #[test]
    fn skipped_save_never_reaches_storage() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);

        assert!(engine.save("abc", &1, Ttl::Seconds(-1)).expect("valid key"));
        assert!(engine.save("abc", &1, Ttl::At(999)).expect("valid key"));

        assert!(mock.operations().is_empty());
    }

    #[test]
    fn invalid_input_is_rejected_before_io() {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, engine) = mock_engine(&control);

        assert!(matches!(engine.get::<i32>("a:b"), Err(Error::InvalidKey(_))));
        assert!(matches!(engine.save("", &1, Ttl::Default), Err(Error::InvalidKey(_))));
        assert!(matches!(engine.save_tagged("a", &1, Ttl::Default, ["a,b"]), Err(Error::InvalidTag(_))));
        assert!(matches!(engine.invalidate_tags([" t"]), Err(Error::InvalidTag(_))));
        assert!(matches!(engine.delete_many(["a", "b/c"]), Err(Error::InvalidKey(_))));

        assert!(mock.operations().is_empty());
    }

    #[test]
    fn listener_sees_completed_operations() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut engine = CacheEngine::new(
            Backend::from(MemoryBackend::new(MemoryStore::new(), Namespace::default())),
            memory_journal(),
        );
        engine.listener = Some(EventListener::new(move |event: &CacheEvent| sink.lock().push(event.clone())));

        engine.save("abc", &1, Ttl::Default).expect("valid key");
        engine.save("abc", &1, Ttl::Seconds(-5)).expect("valid key");
        engine.get::<i32>("abc").expect("valid key");
        engine.get::<i32>("def").expect("valid key");
        engine.delete("abc").expect("valid key");
        engine.clear().expect("clear never errors");

        let key = |k: &str| k.to_string();
        assert_eq!(
            *events.lock(),
            [
                CacheEvent::Save { key: key("abc") },
                CacheEvent::Hit { key: key("abc") },
                CacheEvent::Miss { key: key("def") },
                CacheEvent::Delete { key: key("abc") },
                CacheEvent::Clear,
            ]
        );
    }

    #[test]
    fn operations_are_logged_with_activity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let (mock, mut engine) = mock_engine(&control);
        engine.name = "logged";
        engine.telemetry = TelemetryConfig::new().with_logs().build();

        engine.save("abc", &1, Ttl::Seconds(10)).expect("valid key");
        control.advance(Duration::from_secs(10));
        engine.get::<i32>("abc").expect("valid key");
        mock.fail_when(|_| true);
        engine.delete("abc").expect("valid key");

        capture.assert_contains("logged");
        capture.assert_contains(CacheActivity::Saved.as_str());
        capture.assert_contains(CacheActivity::Expired.as_str());
        capture.assert_contains(CacheOperation::Delete.as_str());
        capture.assert_contains("ERROR");
    }

    #[test]
    fn operations_are_counted_in_metrics() {
        let tester = MetricTester::new();
        let mut engine = CacheEngine::new(
            Backend::from(MemoryBackend::new(MemoryStore::new(), Namespace::default())),
            memory_journal(),
        );
        engine.name = "metered";
        engine.telemetry = TelemetryConfig::new().with_metrics(tester.meter_provider()).build();

        engine.save("abc", &1, Ttl::Default).expect("valid key");
        engine.get::<i32>("missing").expect("valid key");

        tester.assert_attributes_contain(&[
            opentelemetry::KeyValue::new(attributes::NAME, "metered"),
            opentelemetry::KeyValue::new(attributes::ACTIVITY, CacheActivity::Saved.as_str()),
            opentelemetry::KeyValue::new(attributes::ACTIVITY, CacheActivity::Miss.as_str()),
        ]);
    }
}
