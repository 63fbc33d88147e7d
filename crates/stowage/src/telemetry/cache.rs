// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache telemetry recording.

use std::time::Duration;

#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::KeyValue;
use stowage_tier::Error;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::attributes;
#[cfg(any(feature = "metrics", test))]
use crate::telemetry::metrics::Instruments;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};

#[cfg(any(feature = "logs", feature = "metrics", test))]
#[derive(Debug, Default)]
pub(crate) struct CacheTelemetryInner {
    #[cfg(any(feature = "logs", test))]
    pub(crate) logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) instruments: Option<Instruments>,
}

impl CacheTelemetry {
    /// Records one engine operation.
    ///
    /// `error` carries the storage failure behind an [`CacheActivity::Error`] outcome; it only
    /// reaches the log record, never the metric attributes.
    #[inline]
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "no-op when logging is compiled out")
    )]
    pub(crate) fn record(
        &self,
        cache_name: &'static str,
        operation: CacheOperation,
        activity: CacheActivity,
        duration: Duration,
        error: Option<&Error>,
    ) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.inner.instruments {
            let attrs = [
                KeyValue::new(attributes::NAME, cache_name),
                KeyValue::new(attributes::OPERATION, operation.as_str()),
                KeyValue::new(attributes::ACTIVITY, activity.as_str()),
            ];
            instruments.events.add(1, &attrs);
            instruments.operation_duration.record(duration.as_secs_f64(), &attrs);
        }

        #[cfg(any(feature = "logs", test))]
        if self.inner.logging_enabled {
            Self::emit(cache_name, operation, activity, Some(duration), error);
        }
    }

    /// Records the number of values in the engine's scope.
    ///
    /// `size` is only evaluated when metrics are configured.
    #[inline]
    #[cfg_attr(
        not(any(feature = "metrics", test)),
        expect(unused_variables, reason = "no-op when metrics are compiled out")
    )]
    pub(crate) fn record_size(&self, cache_name: &'static str, size: impl FnOnce() -> Option<u64>) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.inner.instruments
            && let Some(size) = size()
        {
            instruments.size.record(size, &[KeyValue::new(attributes::NAME, cache_name)]);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn emit(
        cache_name: &'static str,
        operation: CacheOperation,
        activity: CacheActivity,
        duration: Option<Duration>,
        error: Option<&Error>,
    ) {
        let op = operation.as_str();
        let ev = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());
        let error = error.map(tracing::field::display);

        // Tracing levels must be constant, so the level is picked by macro.
        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.operation = op,
                    cache.activity = ev,
                    cache.duration_ns = ?duration_ns,
                    cache.error = error,
                    "cache.event"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Info => emit_event!(info),
            Severity::Debug => emit_event!(debug),
            _ => {}
        }
    }
}
