// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache telemetry integration with `tracing` and OpenTelemetry.
//!
//! Every engine operation is recorded as a `cache.event` log record (feature `logs`) and, when a
//! meter provider is configured, as an event count and a duration sample (feature `metrics`).
//! Logging and metrics are opted into per engine through [`TelemetryConfig`].

#[cfg(any(feature = "logs", feature = "metrics", test))]
use std::sync::Arc;

#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;

pub(crate) mod attributes;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

#[cfg(any(feature = "logs", feature = "metrics", test))]
use cache::CacheTelemetryInner;
pub use config::TelemetryConfig;

/// Telemetry sink shared by an engine's operations.
///
/// Built from a [`TelemetryConfig`]; the default value records nothing.
#[derive(Clone, Debug, Default)]
pub(crate) struct CacheTelemetry {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    inner: Arc<CacheTelemetryInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Has,
    Save,
    Delete,
    Clear,
    InvalidateTags,
}

impl CacheOperation {
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(dead_code, reason = "only read by log and metric recording")
    )]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Has => "cache.has",
            Self::Save => "cache.save",
            Self::Delete => "cache.delete",
            Self::Clear => "cache.clear",
            Self::InvalidateTags => "cache.invalidate_tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Expired,
    Saved,
    /// A save resolved to a negative TTL and was not performed.
    Skipped,
    Deleted,
    Invalidated,
    Ok,
    Error,
}

impl CacheActivity {
    #[cfg_attr(
        not(any(feature = "logs", feature = "metrics", test)),
        expect(dead_code, reason = "only read by log and metric recording")
    )]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Saved => "cache.saved",
            Self::Skipped => "cache.skipped",
            Self::Deleted => "cache.deleted",
            Self::Invalidated => "cache.invalidated",
            Self::Ok => "cache.ok",
            Self::Error => "cache.error",
        }
    }

    #[cfg(any(feature = "logs", test))]
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Skipped | Self::Ok => Severity::Debug,
            Self::Expired | Self::Saved | Self::Deleted | Self::Invalidated => Severity::Info,
            Self::Error => Severity::Error,
        }
    }
}
