// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Notifications fired by cache engines.

use std::fmt;
use std::sync::Arc;

/// Something that happened to a cache engine.
///
/// Events are fired after the operation completes, and only for operations that reached the
/// storage layer: a save skipped because of a negative TTL fires nothing, nor do failed writes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheEvent {
    /// A read found a live value.
    Hit {
        /// The key that was read.
        key: String,
    },
    /// A read found nothing, an expired value or an undecodable value.
    Miss {
        /// The key that was read.
        key: String,
    },
    /// A value was written.
    Save {
        /// The key that was written.
        key: String,
    },
    /// A value and its metadata were removed.
    Delete {
        /// The key that was removed.
        key: String,
    },
    /// The engine's whole scope was cleared.
    Clear,
}

impl CacheEvent {
    /// The key the event concerns, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Hit { key } | Self::Miss { key } | Self::Save { key } | Self::Delete { key } => Some(key),
            Self::Clear => None,
        }
    }
}

/// A callback receiving every [`CacheEvent`] of an engine.
///
/// The callback runs synchronously on the thread performing the operation; a panicking listener
/// unwinds through the cache call.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use stowage::{CacheEngine, CacheEvent, CacheLayer, EventListener, Ttl};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
///
/// let engine = CacheEngine::builder()
///     .on_event(EventListener::new(move |event: &CacheEvent| {
///         sink.lock().unwrap().push(event.clone());
///     }))
///     .memory()
///     .build()?;
///
/// engine.save("abc", &1, Ttl::Default)?;
/// assert_eq!(seen.lock().unwrap()[0], CacheEvent::Save { key: "abc".to_string() });
/// # Ok::<(), stowage::Error>(())
/// ```
#[derive(Clone)]
pub struct EventListener(Arc<dyn Fn(&CacheEvent) + Send + Sync>);

impl EventListener {
    /// Wraps `listener`.
    pub fn new<F>(listener: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(listener))
    }

    pub(crate) fn notify(&self, event: &CacheEvent) {
        (self.0)(event);
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener").finish_non_exhaustive()
    }
}

impl<F> From<F> for EventListener
where
    F: Fn(&CacheEvent) + Send + Sync + 'static,
{
    fn from(listener: F) -> Self {
        Self::new(listener)
    }
}
