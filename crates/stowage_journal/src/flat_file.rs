// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use stowage_tier::{KeyValidator, MetadataRecord, Result, fs};

const EXTENSION: &str = "meta";
const EXPIRES_AT: &str = "expiresAt=";
const TAGS: &str = "tags=";

/// Journal keeping one `<key>.meta` sidecar file per key.
///
/// Each file holds up to two newline-terminated lines, `expiresAt=<epoch seconds>` and
/// `tags=<tag>,<tag>`, each present only when the record has that part:
///
/// ```text
/// expiresAt=30
/// tags=tag1,tag2
/// ```
///
/// Writing the default record deletes the file. Files are replaced atomically, so concurrent
/// writers of one key leave one complete version behind. Tag lookups read every `.meta` file in
/// the directory.
#[derive(Debug, Clone)]
pub struct FlatFileJournal {
    dir: PathBuf,
}

impl FlatFileJournal {
    /// Creates a journal writing into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDirectory`] unless `dir` is an existing, writable directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            dir: fs::writable_dir(dir)?,
        })
    }

    /// The directory holding the `.meta` files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        KeyValidator::validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    pub(crate) fn get(&self, key: &str) -> MetadataRecord {
        let Ok(path) = self.path(key) else {
            return MetadataRecord::default();
        };

        read_record(&path).unwrap_or_default()
    }

    pub(crate) fn set(&self, key: &str, record: &MetadataRecord) -> Result<()> {
        let path = self.path(key)?;
        if record.is_empty() {
            fs::remove_file(&path)?;
        } else {
            fs::write_atomic(&path, render(record).as_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn clear(&self, key: Option<&str>) -> Result<()> {
        match key {
            Some(key) => fs::remove_file(&self.path(key)?)?,
            None => fs::remove_files_with_extension(&self.dir, EXTENSION)?,
        }
        Ok(())
    }

    pub(crate) fn keys_by_tags(&self, tags: &[String]) -> Result<Vec<String>> {
        let files = fs::files_with_extension(&self.dir, EXTENSION)?;

        Ok(files
            .into_iter()
            .filter(|(key, _)| KeyValidator::is_key_valid(key))
            .filter(|(_, path)| read_record(path).is_some_and(|record| record.has_any_tag(tags)))
            .map(|(key, _)| key)
            .collect())
    }
}

/// Reads a record; missing, unreadable and malformed files all read as `None`.
fn read_record(path: &Path) -> Option<MetadataRecord> {
    match fs::read_optional(path) {
        Ok(Some(contents)) => {
            let record = parse(&contents);
            if record.is_none() {
                tracing::warn!(path = %path.display(), "ignoring malformed cache metadata file");
            }
            record
        }
        Ok(None) => None,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "cannot read cache metadata file");
            None
        }
    }
}

fn parse(contents: &str) -> Option<MetadataRecord> {
    let mut expires_at = None;
    let mut tags = Vec::new();

    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        if let Some(value) = line.strip_prefix(EXPIRES_AT) {
            expires_at = Some(value.trim().parse::<i64>().ok()?);
        } else if let Some(value) = line.strip_prefix(TAGS) {
            tags.extend(value.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_string));
        } else {
            return None;
        }
    }

    Some(MetadataRecord::new(expires_at, tags))
}

fn render(record: &MetadataRecord) -> String {
    let mut out = String::new();
    if let Some(expires_at) = record.expires_at() {
        let _ = writeln!(out, "{EXPIRES_AT}{expires_at}");
    }
    if !record.tags().is_empty() {
        let joined = record.tags().iter().map(String::as_str).collect::<Vec<_>>().join(",");
        let _ = writeln!(out, "{TAGS}{joined}");
    }
    out
}
