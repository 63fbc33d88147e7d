// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// The lifetime requested for a saved value.
///
/// A TTL is relative; engines convert it into an absolute expiration at write time. A resolved
/// TTL below zero turns a save into a no-op, and a TTL of zero stores a value that is already
/// expired.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stowage_tier::Ttl;
///
/// let default = Some(Duration::from_secs(60));
/// assert_eq!(Ttl::Default.resolve(default, 1_000), Some(60));
/// assert_eq!(Ttl::from(10).resolve(default, 1_000), Some(10));
/// assert_eq!(Ttl::At(900).resolve(default, 1_000), Some(-100));
/// assert_eq!(Ttl::Default.resolve(None, 1_000), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ttl {
    /// Use the engine's default TTL; without one the value never expires.
    #[default]
    Default,
    /// Expire after this many seconds; negative values skip the save.
    Seconds(i64),
    /// Expire after this duration, truncated to whole seconds.
    Duration(Duration),
    /// Expire at this absolute time, in epoch seconds.
    At(i64),
}

impl Ttl {
    /// Resolves to a relative lifetime in seconds, or `None` for "never expires".
    #[must_use]
    pub fn resolve(self, default: Option<Duration>, now: i64) -> Option<i64> {
        match self {
            Self::Default => default.map(duration_secs),
            Self::Seconds(secs) => Some(secs),
            Self::Duration(duration) => Some(duration_secs(duration)),
            Self::At(at) => Some(at.saturating_sub(now)),
        }
    }
}

fn duration_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Self::Seconds(secs)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Self::Duration(duration)
    }
}

impl<T: Into<Self>> From<Option<T>> for Ttl {
    fn from(ttl: Option<T>) -> Self {
        ttl.map_or(Self::Default, Into::into)
    }
}
