// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments recorded by cache engines.

use opentelemetry::InstrumentationScope;
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};

const SCOPE_SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

/// Instruments shared by every engine configured from one [`TelemetryConfig`][super::TelemetryConfig].
#[derive(Clone, Debug)]
pub(crate) struct Instruments {
    /// One increment per operation outcome.
    pub(crate) events: Counter<u64>,
    /// Wall time of each storage round trip, in seconds.
    pub(crate) operation_duration: Histogram<f64>,
    /// Values held in the engine's namespace, for stores that count cheaply.
    pub(crate) size: Gauge<u64>,
}

impl Instruments {
    pub(crate) fn new(provider: &dyn MeterProvider) -> Self {
        let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(SCOPE_SCHEMA_URL)
            .build();
        let meter = provider.meter_with_scope(scope);

        Self {
            events: meter
                .u64_counter("cache.event.count")
                .with_description("Outcomes of cache engine operations")
                .with_unit("{event}")
                .build(),
            operation_duration: meter
                .f64_histogram("cache.operation.duration")
                .with_description("Duration of cache engine operations, including journal writes")
                .with_unit("s")
                .build(),
            size: meter
                .u64_gauge("cache.size")
                .with_description("Values stored in the engine's namespace")
                .with_unit("{entry}")
                .build(),
        }
    }
}
