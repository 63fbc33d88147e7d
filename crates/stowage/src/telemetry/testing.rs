// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Capture helpers for telemetry assertions in unit tests.

use std::io;
use std::sync::Arc;

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
use parking_lot::Mutex;
use tracing_subscriber::layer::SubscriberExt;

/// A meter provider whose exports stay in memory.
#[derive(Debug)]
pub(crate) struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Flushes the provider and returns the attributes of every exported data point.
    pub fn collect_attributes(&self) -> Vec<KeyValue> {
        self.provider.force_flush().expect("metrics should flush");

        let mut attributes = Vec::new();
        for resource in self.exporter.get_finished_metrics().expect("exported metrics should be readable") {
            for metric in resource.scope_metrics().flat_map(|scope| scope.metrics()) {
                match metric.data() {
                    AggregatedMetrics::U64(MetricData::Sum(sum)) => {
                        attributes.extend(sum.data_points().flat_map(|p| p.attributes().cloned()));
                    }
                    AggregatedMetrics::U64(MetricData::Gauge(gauge)) => {
                        attributes.extend(gauge.data_points().flat_map(|p| p.attributes().cloned()));
                    }
                    AggregatedMetrics::F64(MetricData::Histogram(histogram)) => {
                        attributes.extend(histogram.data_points().flat_map(|p| p.attributes().cloned()));
                    }
                    _ => {}
                }
            }
        }
        attributes
    }

    pub fn assert_attributes_contain(&self, expected: &[KeyValue]) {
        let attributes = self.collect_attributes();
        let missing: Vec<_> = expected.iter().filter(|kv| !attributes.contains(kv)).collect();
        assert!(missing.is_empty(), "missing {missing:?} in exported attributes {attributes:?}");
    }
}

/// Formatted `tracing` output collected into a shared buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "expected {expected:?} in captured logs:\n{output}");
    }

    /// A subscriber formatting every level into this buffer, for `tracing::subscriber::set_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber {
        let capture = self.clone();
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || capture.clone());
        tracing_subscriber::registry().with(layer)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
