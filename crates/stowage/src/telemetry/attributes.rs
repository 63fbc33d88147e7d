// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Attribute and field names shared by metrics and log records.

#[cfg(any(feature = "metrics", test))]
pub(crate) const NAME: &str = "cache.name";
#[cfg(any(feature = "metrics", test))]
pub(crate) const OPERATION: &str = "cache.operation";
#[cfg(any(feature = "metrics", test))]
pub(crate) const ACTIVITY: &str = "cache.activity";

// Log-only fields; the `tracing` macros spell them inline.
#[cfg(test)]
pub(crate) const DURATION_NS: &str = "cache.duration_ns";
#[cfg(test)]
pub(crate) const ERROR: &str = "cache.error";
#[cfg(test)]
pub(crate) const EVENT_MESSAGE: &str = "cache.event";
