// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use stowage_tier::{Error, MetadataRecord, Namespace, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_meta_ttl (key TEXT NOT NULL UNIQUE, ttl INTEGER NULL);
CREATE TABLE IF NOT EXISTS cache_meta_tags (key TEXT NOT NULL, tag TEXT NOT NULL, UNIQUE (key, tag));
CREATE INDEX IF NOT EXISTS idx_tags_tag ON cache_meta_tags (tag);
";

/// Journal storing metadata in two SQLite tables.
///
/// `cache_meta_ttl(key, ttl)` holds at most one expiration row per key and
/// `cache_meta_tags(key, tag)` one row per key and tag, indexed by tag so tag lookups do not scan.
/// Keys are stored namespace-qualified, so engines with different namespaces can share a
/// database. The schema is created on first use.
///
/// # Examples
///
/// ```
/// use stowage_journal::{Journal, SqliteJournal};
/// use stowage_tier::{MetadataRecord, Namespace};
///
/// let journal = Journal::from(SqliteJournal::in_memory(Namespace::default())?);
/// journal.set("abc", &MetadataRecord::new(Some(30), ["tag1"]))?;
/// assert_eq!(journal.get("abc").expires_at(), Some(30));
/// # Ok::<(), stowage_tier::Error>(())
/// ```
#[derive(Debug)]
pub struct SqliteJournal {
    conn: Mutex<Connection>,
    namespace: Namespace,
}

impl SqliteJournal {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>, namespace: Namespace) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::InvalidConfiguration(format!("cannot open journal database {}: {e}", path.display())))?;
        Self::from_connection(conn, namespace)
    }

    /// Creates a journal backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the database cannot be created.
    pub fn in_memory(namespace: Namespace) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::InvalidConfiguration(format!("cannot open in-memory journal database: {e}")))?;
        Self::from_connection(conn, namespace)
    }

    /// Wraps an already open connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the schema cannot be created.
    pub fn from_connection(conn: Connection, namespace: Namespace) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::InvalidConfiguration(format!("cannot create journal schema: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            namespace,
        })
    }

    pub(crate) fn get(&self, key: &str) -> MetadataRecord {
        self.try_get(&self.namespace.qualify(key)).unwrap_or_else(|error| {
            tracing::warn!(key, %error, "cannot read cache metadata row");
            MetadataRecord::default()
        })
    }

    fn try_get(&self, key: &str) -> rusqlite::Result<MetadataRecord> {
        let conn = self.conn.lock();

        let expires_at: Option<i64> = conn
            .query_row("SELECT ttl FROM cache_meta_ttl WHERE key = ?1", [key], |row| row.get(0))
            .optional()?
            .flatten();

        let mut stmt = conn.prepare_cached("SELECT tag FROM cache_meta_tags WHERE key = ?1")?;
        let tags = stmt
            .query_map([key], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;

        Ok(MetadataRecord::new(expires_at, tags))
    }

    pub(crate) fn set(&self, key: &str, record: &MetadataRecord) -> Result<()> {
        let key = self.namespace.qualify(key);
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(Error::storage)?;

        if record.is_empty() {
            delete_key(&tx, &key)?;
        } else {
            tx.execute(
                "INSERT INTO cache_meta_ttl (key, ttl) VALUES (?1, ?2) \
                 ON CONFLICT (key) DO UPDATE SET ttl = excluded.ttl",
                params![key, record.expires_at()],
            )
            .map_err(Error::storage)?;
            tx.execute("DELETE FROM cache_meta_tags WHERE key = ?1", [&key])
                .map_err(Error::storage)?;
            for tag in record.tags() {
                tx.execute("INSERT INTO cache_meta_tags (key, tag) VALUES (?1, ?2)", [&key, tag])
                    .map_err(Error::storage)?;
            }
        }

        tx.commit().map_err(Error::storage)
    }

    pub(crate) fn clear(&self, key: Option<&str>) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(Error::storage)?;

        match (key, self.namespace.like_pattern()) {
            (Some(key), _) => delete_key(&tx, &self.namespace.qualify(key))?,
            (None, Some(pattern)) => {
                for table in ["cache_meta_ttl", "cache_meta_tags"] {
                    tx.execute(&format!("DELETE FROM {table} WHERE key LIKE ?1 ESCAPE '\\'"), [&pattern])
                        .map_err(Error::storage)?;
                }
            }
            (None, None) => {
                for table in ["cache_meta_ttl", "cache_meta_tags"] {
                    tx.execute(&format!("DELETE FROM {table} WHERE instr(key, ':') = 0"), [])
                        .map_err(Error::storage)?;
                }
            }
        }

        tx.commit().map_err(Error::storage)
    }

    pub(crate) fn keys_by_tags(&self, tags: &[String]) -> Result<Vec<String>> {
        let placeholders = vec!["?"; tags.len()].join(", ");
        let sql = format!("SELECT DISTINCT key FROM cache_meta_tags WHERE tag IN ({placeholders})");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(Error::storage)?;
        let physical = stmt
            .query_map(params_from_iter(tags), |row| row.get::<_, String>(0))
            .map_err(Error::storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::storage)?;

        Ok(physical
            .iter()
            .filter_map(|key| self.namespace.strip(key).map(str::to_string))
            .collect())
    }
}

fn delete_key(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM cache_meta_ttl WHERE key = ?1", [key])
        .map_err(Error::storage)?;
    conn.execute("DELETE FROM cache_meta_tags WHERE key = ?1", [key])
        .map_err(Error::storage)?;
    Ok(())
}
