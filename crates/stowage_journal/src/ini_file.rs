// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::Mutex;
use stowage_tier::{KeyValidator, MetadataRecord, Result, fs};

const FILE_NAME: &str = "journal.ini";
const EXPIRES_AT: &str = "expiresAt";
const TAGS: &str = "tags[]";

/// Write locks shared by every journal instance opened on the same file.
static FILE_LOCKS: LazyLock<DashMap<PathBuf, Arc<Mutex<()>>>> = LazyLock::new(DashMap::new);

/// Journal keeping every record in a single `journal.ini` file.
///
/// Each non-default record becomes a section named after its key, in first-write order:
///
/// ```text
/// [abc]
/// expiresAt = 30
/// tags[] = tag1
/// tags[] = tag2
/// [def]
/// expiresAt = 50
/// ```
///
/// Control characters and whitespace at either end of a key are written as `\u{..}` escapes in
/// the section name; keys never contain `\`, so the escape is unambiguous. A tag that starts and
/// ends with `"` is written in an extra pair of quotes, since quoted values are unquoted on read.
///
/// Every write rewrites the whole file. Writers in this process are serialized per file; writers
/// in other processes are not coordinated and may lose updates. The file is deleted once it holds
/// no sections.
#[derive(Debug, Clone)]
pub struct IniFileJournal {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

type Sections = Vec<(String, MetadataRecord)>;

impl IniFileJournal {
    /// Creates a journal storing `journal.ini` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDirectory`][stowage_tier::Error::InvalidDirectory] unless `dir` is an
    /// existing, writable directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = fs::writable_dir(dir)?;
        let path = std::fs::canonicalize(&dir).unwrap_or(dir).join(FILE_NAME);
        let lock = Arc::clone(FILE_LOCKS.entry(path.clone()).or_default().value());
        Ok(Self { path, lock })
    }

    /// The path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn get(&self, key: &str) -> MetadataRecord {
        self.read()
            .into_iter()
            .find_map(|(section, record)| (section == key).then_some(record))
            .unwrap_or_default()
    }

    pub(crate) fn set(&self, key: &str, record: &MetadataRecord) -> Result<()> {
        KeyValidator::validate_key(key)?;

        let _guard = self.lock.lock();
        let mut sections = self.read();
        match sections.iter_mut().find(|(section, _)| section == key) {
            Some((_, existing)) => existing.clone_from(record),
            None => sections.push((key.to_string(), record.clone())),
        }
        self.write(&sections)
    }

    pub(crate) fn clear(&self, key: Option<&str>) -> Result<()> {
        let _guard = self.lock.lock();
        match key {
            Some(key) => {
                let mut sections = self.read();
                let before = sections.len();
                sections.retain(|(section, _)| section != key);
                if sections.len() == before {
                    return Ok(());
                }
                self.write(&sections)
            }
            None => Ok(fs::remove_file(&self.path)?),
        }
    }

    pub(crate) fn keys_by_tags(&self, tags: &[String]) -> Vec<String> {
        self.read()
            .into_iter()
            .filter(|(_, record)| record.has_any_tag(tags))
            .map(|(key, _)| key)
            .collect()
    }

    /// Reads all sections; a missing, unreadable or malformed file reads as empty.
    fn read(&self) -> Sections {
        match fs::read_optional(&self.path) {
            Ok(Some(contents)) => parse(&contents).unwrap_or_else(|| {
                tracing::warn!(path = %self.path.display(), "ignoring malformed cache journal");
                Sections::new()
            }),
            Ok(None) => Sections::new(),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "cannot read cache journal");
                Sections::new()
            }
        }
    }

    fn write(&self, sections: &Sections) -> Result<()> {
        let contents = render(sections);
        if contents.is_empty() {
            fs::remove_file(&self.path)?;
        } else {
            fs::write_atomic(&self.path, contents.as_bytes())?;
        }
        Ok(())
    }
}

fn parse(contents: &str) -> Option<Sections> {
    let mut sections: Vec<(String, Option<i64>, Vec<String>)> = Vec::new();

    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            sections.push((unescape_section(name)?, None, Vec::new()));
            continue;
        }

        let (_, expires_at, tags) = sections.last_mut()?;
        let (name, value) = line.split_once('=')?;
        let value = unquote(value.trim());
        match name.trim() {
            EXPIRES_AT => *expires_at = Some(value.parse().ok()?),
            TAGS => tags.push(value.to_string()),
            _ => {}
        }
    }

    Some(
        sections
            .into_iter()
            .map(|(key, expires_at, tags)| (key, MetadataRecord::new(expires_at, tags)))
            .filter(|(_, record)| !record.is_empty())
            .collect(),
    )
}

fn unquote(value: &str) -> &str {
    if is_quoted(value) { &value[1..value.len() - 1] } else { value }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

fn escape_section(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.char_indices() {
        let at_edge = i == 0 || i + c.len_utf8() == key.len();
        if c.is_control() || (at_edge && c.is_whitespace()) {
            let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape_section(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some((plain, escaped)) = rest.split_once("\\u{") {
        out.push_str(plain);
        let (hex, tail) = escaped.split_once('}')?;
        out.push(char::from_u32(u32::from_str_radix(hex, 16).ok()?)?);
        rest = tail;
    }
    out.push_str(rest);
    Some(out)
}

fn render(sections: &Sections) -> String {
    let mut out = String::new();
    for (key, record) in sections.iter().filter(|(_, record)| !record.is_empty()) {
        let _ = writeln!(out, "[{}]", escape_section(key));
        if let Some(expires_at) = record.expires_at() {
            let _ = writeln!(out, "{EXPIRES_AT} = {expires_at}");
        }
        for tag in record.tags() {
            if is_quoted(tag) {
                let _ = writeln!(out, "{TAGS} = \"{tag}\"");
            } else {
                let _ = writeln!(out, "{TAGS} = {tag}");
            }
        }
    }
    out
}
