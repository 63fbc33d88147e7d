// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "sqlite")]

//! Integration tests running the shared journal contract against every variant.

use rstest::rstest;
use stowage_journal::{FlatFileJournal, IniFileJournal, Journal, MemoryJournal, SqliteJournal};
use stowage_tier::{MemoryStore, MetadataRecord, Namespace};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Memory,
    FlatFile,
    IniFile,
    Sqlite,
}

/// Keeps the temporary directory alive as long as the journal under test.
struct Fixture {
    _dir: TempDir,
    journal: Journal,
}

fn fixture(kind: Kind) -> Fixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let journal = match kind {
        Kind::Memory => Journal::from(MemoryJournal::new(MemoryStore::new(), Namespace::default())),
        Kind::FlatFile => Journal::from(FlatFileJournal::new(dir.path()).expect("flat-file journal")),
        Kind::IniFile => Journal::from(IniFileJournal::new(dir.path()).expect("ini journal")),
        Kind::Sqlite => Journal::from(SqliteJournal::open(dir.path().join("journal.sqlite"), Namespace::default()).expect("sqlite journal")),
    };
    Fixture { _dir: dir, journal }
}

fn tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(ToString::to_string).collect()
}

fn keys_by_tags(journal: &Journal, wanted: &[&str]) -> Vec<String> {
    journal.keys_by_tags(&tags(wanted)).expect("tag query failed").collect()
}

#[rstest]
fn set_then_get_returns_record(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    let record = MetadataRecord::new(Some(30), ["tag1", "tag2"]);

    journal.set("abc", &record).expect("set failed");

    assert_eq!(journal.get("abc"), record);
}

#[rstest]
fn set_replaces_record_wholesale(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;

    journal.set("abc", &MetadataRecord::new(Some(30), ["tag1"])).expect("set failed");
    journal.set("abc", &MetadataRecord::new(None, ["tag2"])).expect("set failed");

    assert_eq!(journal.get("abc"), MetadataRecord::new(None, ["tag2"]));
    assert!(keys_by_tags(&journal, &["tag1"]).is_empty());
}

#[rstest]
fn unknown_key_reads_as_default(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    assert!(journal.get("never-written").is_empty());
}

#[rstest]
fn empty_record_equals_never_written(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;

    journal.set("abc", &MetadataRecord::new(Some(30), ["tag1"])).expect("set failed");
    journal.set("abc", &MetadataRecord::default()).expect("set failed");

    assert!(journal.get("abc").is_empty());
    assert!(keys_by_tags(&journal, &["tag1"]).is_empty());
}

#[rstest]
fn clear_key_removes_record_and_tags(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    journal.set("abc", &MetadataRecord::new(Some(30), ["tag1"])).expect("set failed");
    journal.set("def", &MetadataRecord::new(Some(50), ["tag1"])).expect("set failed");

    journal.clear(Some("abc")).expect("clear failed");

    assert!(journal.get("abc").is_empty());
    assert_eq!(journal.get("def").expires_at(), Some(50));
    assert_eq!(keys_by_tags(&journal, &["tag1"]), ["def"]);
}

#[rstest]
fn clear_is_idempotent(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;

    journal.clear(Some("absent")).expect("clearing an absent key succeeds");
    journal.clear(None).expect("clearing an empty journal succeeds");
    journal.clear(None).expect("clearing twice succeeds");
}

#[rstest]
fn clear_all_empties_the_journal(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    journal.set("abc", &MetadataRecord::new(Some(30), ["tag1"])).expect("set failed");
    journal.set("def", &MetadataRecord::new(None, ["tag2"])).expect("set failed");

    journal.clear(None).expect("clear failed");

    assert!(journal.get("abc").is_empty());
    assert!(journal.get("def").is_empty());
    assert!(keys_by_tags(&journal, &["tag1", "tag2"]).is_empty());
}

#[rstest]
fn tag_lookup_returns_intersecting_keys_once(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    journal.set("a", &MetadataRecord::new(None, ["red", "blue"])).expect("set failed");
    journal.set("b", &MetadataRecord::new(Some(10), ["blue"])).expect("set failed");
    journal.set("c", &MetadataRecord::new(None, ["green"])).expect("set failed");
    journal.set("d", &MetadataRecord::expiring_at(10)).expect("set failed");

    assert_eq!(keys_by_tags(&journal, &["red", "blue"]), ["a", "b"]);
    assert_eq!(keys_by_tags(&journal, &["green"]), ["c"]);
    assert!(keys_by_tags(&journal, &["purple"]).is_empty());
}

#[rstest]
fn bracketed_keys_and_quoted_tags_round_trip(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    let record = MetadataRecord::new(Some(30), ["\"q\"", "[t]", "a=b"]);
    let keys = [" padded ", "]x[", "a[1]", "tab\there"];

    for key in keys {
        journal.set(key, &record).expect("set failed");
    }

    for key in keys {
        assert_eq!(journal.get(key), record, "{key:?}");
    }
    let mut quoted = keys_by_tags(journal, &["\"q\""]);
    quoted.sort();
    assert_eq!(quoted, keys);
    assert!(keys_by_tags(journal, &["q"]).is_empty());
}

#[rstest]
fn empty_tag_query_matches_nothing(#[values(Kind::Memory, Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let fx = fixture(kind);
    let journal = &fx.journal;
    journal.set("a", &MetadataRecord::new(None, ["red"])).expect("set failed");

    assert_eq!(journal.keys_by_tags(&[]).expect("tag query failed").count(), 0);
}

#[rstest]
fn records_persist_across_instances(#[values(Kind::FlatFile, Kind::IniFile, Kind::Sqlite)] kind: Kind) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let open = || match kind {
        Kind::FlatFile => Journal::from(FlatFileJournal::new(dir.path()).expect("flat-file journal")),
        Kind::IniFile => Journal::from(IniFileJournal::new(dir.path()).expect("ini journal")),
        Kind::Sqlite => Journal::from(SqliteJournal::open(dir.path().join("journal.sqlite"), Namespace::default()).expect("sqlite journal")),
        Kind::Memory => unreachable!("memory journals do not persist"),
    };

    open().set("abc", &MetadataRecord::new(Some(30), ["tag1"])).expect("set failed");

    let reopened = open();
    assert_eq!(reopened.get("abc"), MetadataRecord::new(Some(30), ["tag1"]));
    assert_eq!(keys_by_tags(&reopened, &["tag1"]), ["abc"]);
}

#[test]
fn kinds_are_named() {
    assert_eq!(fixture(Kind::Memory).journal.kind(), "memory");
    assert_eq!(fixture(Kind::FlatFile).journal.kind(), "flat_file");
    assert_eq!(fixture(Kind::IniFile).journal.kind(), "ini_file");
    assert_eq!(fixture(Kind::Sqlite).journal.kind(), "sqlite");
}
