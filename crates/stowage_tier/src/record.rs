// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;

/// Expiration and tag metadata tracked for one cache key.
///
/// A record is immutable once built and is always replaced wholesale. The default record (no
/// expiration, no tags) is indistinguishable from "no record at all".
///
/// # Examples
///
/// ```
/// use stowage_tier::MetadataRecord;
///
/// let record = MetadataRecord::new(Some(30), ["tag1", "tag2"]);
/// assert_eq!(record.expires_at(), Some(30));
/// assert!(record.is_expired_at(30));
/// assert!(!record.is_expired_at(29));
///
/// assert!(MetadataRecord::default().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MetadataRecord {
    expires_at: Option<i64>,
    tags: BTreeSet<String>,
}

impl MetadataRecord {
    /// Creates a record from an absolute expiration (epoch seconds) and a set of tags.
    #[must_use]
    pub fn new<I, S>(expires_at: Option<i64>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expires_at,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a record carrying only an expiration.
    #[must_use]
    pub fn expiring_at(expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
            tags: BTreeSet::new(),
        }
    }

    /// The absolute expiration in epoch seconds, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// The tags attached to the key, in sorted order.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns `true` for the default record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expires_at.is_none() && self.tags.is_empty()
    }

    /// Returns `true` once `now` has reached the expiration.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Returns `true` if any of `tags` is attached to this record.
    #[must_use]
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty() {
        let record = MetadataRecord::default();
        assert!(record.is_empty());
        assert_eq!(record.expires_at(), None);
        assert!(record.tags().is_empty());
        assert!(!record.is_expired_at(i64::MAX));
    }

    #[test]
    fn tags_are_deduplicated() {
        let record = MetadataRecord::new(None, ["b", "a", "b"]);
        let tags: Vec<_> = record.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, ["a", "b"]);
        assert!(!record.is_empty());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let record = MetadataRecord::expiring_at(100);
        assert!(!record.is_expired_at(99));
        assert!(record.is_expired_at(100));
        assert!(record.is_expired_at(101));
    }

    #[test]
    fn has_any_tag_matches_intersection() {
        let record = MetadataRecord::new(None, ["a", "b"]);
        assert!(record.has_any_tag(&["x".to_string(), "b".to_string()]));
        assert!(!record.has_any_tag(&["x".to_string()]));
        assert!(!record.has_any_tag(&[]));
    }
}
