// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use crate::{Error, KeyValidator, Result};

/// Separator between a namespace and a key in a qualified key.
const SEPARATOR: char = ':';

/// Scope of one logical cache inside a shared store.
///
/// Stores that hold a flat key space (memory, Redis, SQLite) qualify keys as `<namespace>:<key>`;
/// file-based stores use a `<namespace>` subdirectory instead. The default namespace leaves keys
/// unqualified.
///
/// Ownership is symmetric: a physical key belongs to namespace `ns` only if it is `ns:` followed
/// by a legal key, and belongs to the default namespace only if it is itself a legal key. Because
/// legal keys never contain `:`, no physical key belongs to two namespaces.
///
/// # Examples
///
/// ```
/// use stowage_tier::Namespace;
///
/// let ns = Namespace::new("sessions")?;
/// assert_eq!(ns.qualify("abc"), "sessions:abc");
/// assert_eq!(ns.strip("sessions:abc"), Some("abc"));
/// assert_eq!(ns.strip("abc"), None);
///
/// let default = Namespace::default();
/// assert_eq!(default.qualify("abc"), "abc");
/// assert_eq!(default.strip("sessions:abc"), None);
/// # Ok::<(), stowage_tier::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace(Option<String>);

impl Namespace {
    /// Creates a namespace; an empty string selects the default namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespace`] if `name` does not follow the key syntax.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Ok(Self(None));
        }

        if KeyValidator::is_key_valid(&name) {
            Ok(Self(Some(name)))
        } else {
            Err(Error::InvalidNamespace(name))
        }
    }

    /// Returns the namespace name, or `None` for the default namespace.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Returns `true` for the default namespace.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    /// Maps a logical key to its physical form in a flat key space.
    #[must_use]
    pub fn qualify(&self, key: &str) -> String {
        match &self.0 {
            Some(ns) => format!("{ns}{SEPARATOR}{key}"),
            None => key.to_string(),
        }
    }

    /// Returns the logical key if `physical` belongs to this namespace.
    #[must_use]
    pub fn strip<'a>(&self, physical: &'a str) -> Option<&'a str> {
        let logical = match &self.0 {
            Some(ns) => physical.strip_prefix(ns.as_str())?.strip_prefix(SEPARATOR)?,
            None => physical,
        };

        KeyValidator::is_key_valid(logical).then_some(logical)
    }

    /// Returns `true` if `physical` belongs to this namespace.
    #[must_use]
    pub fn owns(&self, physical: &str) -> bool {
        self.strip(physical).is_some()
    }

    /// Returns the `LIKE` pattern matching this namespace's qualified keys, or `None` for the
    /// default namespace. `%` and `_` are escaped with `\`.
    #[must_use]
    pub fn like_pattern(&self) -> Option<String> {
        self.0.as_ref().map(|ns| {
            let escaped = ns.replace('%', "\\%").replace('_', "\\_");
            format!("{escaped}{SEPARATOR}%")
        })
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_default() {
        let ns = Namespace::new("").expect("empty namespace is valid");
        assert!(ns.is_default());
        assert_eq!(ns, Namespace::default());
        assert_eq!(ns.to_string(), "");
    }

    #[test]
    fn rejects_illegal_names() {
        assert!(matches!(Namespace::new("a:b"), Err(Error::InvalidNamespace(_))));
        assert!(matches!(Namespace::new("a/b"), Err(Error::InvalidNamespace(_))));
    }

    #[test]
    fn qualify_prefixes_named_namespace() {
        let ns = Namespace::new("ns").expect("valid namespace");
        assert_eq!(ns.qualify("key"), "ns:key");
        assert_eq!(ns.name(), Some("ns"));
    }

    #[test]
    fn ownership_is_symmetric() {
        let default = Namespace::default();
        let ns = Namespace::new("ns").expect("valid namespace");
        let other = Namespace::new("nsx").expect("valid namespace");

        assert!(default.owns("key"));
        assert!(!default.owns("ns:key"));

        assert!(ns.owns("ns:key"));
        assert!(!ns.owns("key"));
        assert!(!ns.owns("nsx:key"));
        assert!(!ns.owns("ns:"));

        assert!(other.owns("nsx:key"));
        assert!(!other.owns("ns:key"));
    }

    #[test]
    fn strip_returns_logical_key() {
        let ns = Namespace::new("ns").expect("valid namespace");
        assert_eq!(ns.strip("ns:abc"), Some("abc"));
        assert_eq!(ns.strip("ns:a:b"), None);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let ns = Namespace::new("my_ns").expect("valid namespace");
        assert_eq!(ns.like_pattern().as_deref(), Some("my\\_ns:%"));
        assert_eq!(Namespace::default().like_pattern(), None);
    }
}
