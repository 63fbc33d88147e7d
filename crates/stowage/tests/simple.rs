// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the `SimpleCache` key/value facade.

use std::time::Duration;

use pretty_assertions::assert_eq;
use stowage::{CacheEngine, CacheLayer, ChainEngine, Error, JournalFormat, SimpleCache, Ttl};
use stowage_tier::ClockControl;

fn cache(control: &ClockControl) -> SimpleCache {
    SimpleCache::new(
        CacheEngine::builder()
            .clock(control.to_clock())
            .memory()
            .build()
            .expect("memory engines always build"),
    )
}

#[test]
fn get_or_falls_back_on_miss_and_expiry() {
    let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100));
    let cache = cache(&control);

    assert_eq!(cache.get_or("abc", 7).expect("valid key"), 7);

    cache.set("abc", &1, Ttl::Seconds(5)).expect("valid key");
    assert_eq!(cache.get_or("abc", 7).expect("valid key"), 1);

    control.advance(Duration::from_secs(5));
    assert_eq!(cache.get_or("abc", 7).expect("valid key"), 7);
}

#[test]
fn multiple_keys_fill_defaults_in_order() {
    let cache = cache(&ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100)));
    cache.set_multiple(&[("b", 2), ("a", 1)], Ttl::Default).expect("valid keys");

    let values = cache.get_multiple(["c", "a", "b"], -1).expect("valid keys");

    assert_eq!(
        values,
        [("c".to_string(), -1), ("a".to_string(), 1), ("b".to_string(), 2)]
    );
}

#[test]
fn delete_multiple_ignores_absent_keys() {
    let cache = cache(&ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100)));
    cache.set("a", &1, Ttl::Default).expect("valid key");

    assert!(cache.delete_multiple(["a", "never-set"]).expect("valid keys"));

    assert!(!cache.has("a").expect("valid key"));
}

#[test]
fn tagged_values_are_invalidated() {
    let cache = cache(&ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100)));
    cache.set_tagged("a", &1, Ttl::Default, ["group"]).expect("valid key");
    cache.set("b", &2, Ttl::Default).expect("valid key");

    assert!(cache.invalidate_tags(["group"]).expect("valid tags"));

    assert_eq!(cache.get::<i32>("a").expect("valid key"), None);
    assert_eq!(cache.get::<i32>("b").expect("valid key"), Some(2));
}

#[test]
fn clear_and_delete_report_success() {
    let cache = cache(&ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100)));
    cache.set("a", &1, Ttl::Default).expect("valid key");

    assert!(cache.delete("a").expect("valid key"));
    cache.set("b", &2, Ttl::Default).expect("valid key");
    assert!(cache.clear().expect("clear never errors"));
    assert!(!cache.has("b").expect("valid key"));
}

#[test]
fn illegal_batch_key_rejects_whole_batch() {
    let cache = cache(&ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(100)));
    cache.set("a", &1, Ttl::Default).expect("valid key");

    assert!(matches!(cache.get_multiple(["a", "b{c}"], 0), Err(Error::InvalidKey(_))));
    assert!(matches!(
        cache.set_multiple(&[("x", 1), ("", 2)], Ttl::Default),
        Err(Error::InvalidKey(_))
    ));
    assert!(matches!(cache.delete_multiple(["a", "b\\c"]), Err(Error::InvalidKey(_))));

    assert!(!cache.has("x").expect("valid key"));
    assert!(cache.has("a").expect("valid key"));
}

#[test]
fn wraps_a_chain() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let chain = ChainEngine::new([
        CacheEngine::builder().memory().build().expect("memory engines always build"),
        CacheEngine::builder()
            .filesystem(dir.path(), JournalFormat::IniFile)
            .build()
            .expect("base directory is writable"),
    ]);
    let cache = SimpleCache::from(chain);

    cache.set("abc", &"both", Ttl::Default).expect("valid key");

    let chain = cache.into_inner();
    assert!(chain.engines()[1].has("abc").expect("valid key"));
    assert!(dir.path().join("abc.cache").is_file());
    assert!(!dir.path().join("journal.ini").exists());
}
