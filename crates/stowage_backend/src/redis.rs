// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use parking_lot::Mutex;
use redis::{Client, Connection};
use stowage_tier::{Error, Namespace, Result};

/// Value store over Redis strings.
///
/// Keys are stored as `<namespace>:<key>`. Positive TTL hints become a native `EX` expiry so
/// Redis reclaims the memory of expired values by itself. Flushing lists the keys owned by the
/// namespace with `KEYS` and removes them with `DEL`, leaving other namespaces intact.
///
/// The connection is used synchronously and serialized behind a mutex; no reconnect or retry is
/// attempted.
pub struct RedisBackend {
    conn: Mutex<Connection>,
    namespace: Namespace,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").field("namespace", &self.namespace).finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(conn: Connection, namespace: Namespace) -> Self {
        Self {
            conn: Mutex::new(conn),
            namespace,
        }
    }

    /// Opens a connection to the server at `url`, e.g. `redis://127.0.0.1:6379/0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the URL is malformed or the server cannot be
    /// reached.
    pub fn connect(url: &str, namespace: Namespace) -> Result<Self> {
        let conn = Client::open(url)
            .and_then(|client| client.get_connection())
            .map_err(|e| Error::InvalidConfiguration(format!("cannot connect to redis: {e}")))?;
        Ok(Self::new(conn, namespace))
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        redis::cmd("GET")
            .arg(self.namespace.qualify(key))
            .query(&mut *self.conn.lock())
            .map_err(Error::storage)
    }

    pub(crate) fn set(&self, key: &str, value: &[u8], native_ttl: Option<Duration>) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.namespace.qualify(key)).arg(value);
        if let Some(ttl) = native_ttl.filter(|ttl| ttl.as_secs() > 0) {
            cmd.arg("EX").arg(ttl.as_secs());
        }
        cmd.query::<()>(&mut *self.conn.lock()).map_err(Error::storage)
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        redis::cmd("DEL")
            .arg(self.namespace.qualify(key))
            .query::<()>(&mut *self.conn.lock())
            .map_err(Error::storage)
    }

    pub(crate) fn exists(&self, key: &str) -> Result<bool> {
        redis::cmd("EXISTS")
            .arg(self.namespace.qualify(key))
            .query(&mut *self.conn.lock())
            .map_err(Error::storage)
    }

    pub(crate) fn flush(&self) -> Result<()> {
        let pattern = match self.namespace.name() {
            Some(name) => format!("{}:*", escape_glob(name)),
            None => "*".to_string(),
        };

        let mut conn = self.conn.lock();
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query(&mut *conn).map_err(Error::storage)?;
        let owned: Vec<&String> = keys.iter().filter(|key| self.namespace.owns(key)).collect();
        if owned.is_empty() {
            return Ok(());
        }

        redis::cmd("DEL").arg(owned).query::<()>(&mut *conn).map_err(Error::storage)
    }
}

fn escape_glob(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '^' | '-') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
