// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry configuration for cache engines.

#[cfg(any(feature = "logs", feature = "metrics", test))]
use std::sync::Arc;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;

use crate::telemetry::CacheTelemetry;
#[cfg(any(feature = "logs", feature = "metrics", test))]
use crate::telemetry::cache::CacheTelemetryInner;
#[cfg(any(feature = "metrics", test))]
use crate::telemetry::metrics::Instruments;

/// Configuration for cache telemetry.
///
/// Everything is disabled by default. Enable logs and/or metrics with the builder methods, then
/// hand the configuration to [`CacheEngineBuilder::telemetry`][crate::CacheEngineBuilder::telemetry].
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "logs")]
/// # fn main() {
/// use stowage::{CacheEngine, TelemetryConfig};
///
/// let engine = CacheEngine::builder()
///     .name("sessions")
///     .telemetry(TelemetryConfig::new().with_logs())
///     .memory()
///     .build()
///     .expect("memory engines always build");
/// # let _ = engine;
/// # }
/// # #[cfg(not(feature = "logs"))]
/// # fn main() {}
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    instruments: Option<Instruments>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a `cache.event` record through `tracing` for every operation.
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Records event counts, operation durations and the value count through OpenTelemetry.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.instruments = Some(Instruments::new(provider));
        self
    }

    #[must_use]
    pub(crate) fn build(self) -> CacheTelemetry {
        #[cfg(not(any(feature = "logs", feature = "metrics", test)))]
        {
            CacheTelemetry {}
        }

        #[cfg(any(feature = "logs", feature = "metrics", test))]
        {
            CacheTelemetry {
                inner: Arc::new(CacheTelemetryInner {
                    #[cfg(any(feature = "logs", test))]
                    logging_enabled: self.logs_enabled,
                    #[cfg(any(feature = "metrics", test))]
                    instruments: self.instruments,
                }),
            }
        }
    }
}
