use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry_sdk::metrics::SdkMeterProvider;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::observability::metric::counter::{key_values, WithAttributes as _};

/// Instrumentation scope name of the probe's meter.
const METER_NAME: &str = "otlp-probe";

/// Instrument names are fixed, downstream dashboards look them up verbatim.
pub const COUNTER_NAME: &str = "python_test_counter1";
pub const GAUGE_NAME: &str = "python_test_gauge1";

const COUNTER_INCREMENTS: u64 = 10;
const GAUGE_READING: f64 = 0.8;

/// Pause after the forced flush so in-flight gRPC writes can finish before
/// the process exits.
const DRAIN_PAUSE: Duration = Duration::from_secs(3);

fn sample_labels() -> IndexMap<String, String> {
    [("lbl1".to_owned(), "val1".to_owned())].into()
}

/// One bounded run of sample metric emission.
///
/// The meter provider is held here explicitly instead of being installed as
/// the process-wide global one, so multiple probes can coexist (tests run
/// several against in-memory transports).
pub struct MetricProbe {
    provider: SdkMeterProvider,
}

impl MetricProbe {
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let provider = config.metric.instantiate()?.into_sdk_meter_provider();
        Ok(Self::new(provider))
    }

    pub fn new(provider: SdkMeterProvider) -> Self {
        Self { provider }
    }

    /// Record the fixed measurement sequence and force-flush it.
    ///
    /// Returns only after every measurement recorded above has been handed
    /// to the export transport.
    pub fn emit(&self) -> Result<(), ProbeError> {
        let meter = self.provider.meter(METER_NAME);

        let counter = meter
            .u64_counter(COUNTER_NAME)
            .with_unit("")
            .with_description("some counter")
            .build()
            .with_attributes(Arc::new(sample_labels()));
        for _ in 0..COUNTER_INCREMENTS {
            counter.add(1);
        }

        // Pull-based instrument: the callback runs on every collection and
        // must re-yield the same single observation each time. It holds no
        // state across invocations.
        let labels = key_values(&sample_labels());
        let _gauge = meter
            .f64_observable_gauge(GAUGE_NAME)
            .with_unit("")
            .with_description("some gauge")
            .with_callback(move |gauge| gauge.observe(GAUGE_READING, &labels))
            .build();

        tracing::debug!(
            "Recorded {COUNTER_INCREMENTS} counter increments and registered the gauge, flushing"
        );

        self.provider.force_flush().map_err(ProbeError::Flush)
    }

    /// Emit, drain, shut the pipeline down and report completion.
    pub async fn run(self) -> Result<(), ProbeError> {
        self.emit()?;

        tokio::time::sleep(DRAIN_PAUSE).await;

        self.provider.shutdown().map_err(ProbeError::Shutdown)?;

        // The single stdout line callers look for. All diagnostics go to
        // stderr via tracing.
        println!("done");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Context, Result};
    use opentelemetry::{Key, KeyValue, Value};
    use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData, ResourceMetrics};
    use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader};

    use super::*;

    fn in_memory_probe() -> (MetricProbe, InMemoryMetricExporter, SdkMeterProvider) {
        let exporter = InMemoryMetricExporter::default();
        let reader = PeriodicReader::builder(exporter.clone()).build();
        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(crate::observability::otlp_resource())
            .build();
        (MetricProbe::new(provider.clone()), exporter, provider)
    }

    fn latest_snapshot(exporter: &InMemoryMetricExporter) -> Result<ResourceMetrics> {
        exporter
            .get_finished_metrics()?
            .into_iter()
            .last()
            .context("no metrics were exported")
    }

    #[tokio::test]
    async fn test_counter_total() -> Result<()> {
        let (probe, exporter, _provider) = in_memory_probe();
        probe.emit()?;

        // emit() only returned after the flush, so the snapshot must already
        // contain all increments.
        let snapshot = latest_snapshot(&exporter)?;
        let metric = snapshot
            .scope_metrics()
            .flat_map(|sm| sm.metrics())
            .find(|m| m.name() == COUNTER_NAME)
            .context("counter was not exported")?;

        assert_eq!(metric.description(), "some counter");
        assert_eq!(metric.unit(), "");

        let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() else {
            bail!("counter should aggregate to a u64 sum");
        };
        assert!(sum.is_monotonic());

        let points: Vec<_> = sum.data_points().collect();
        assert_eq!(points.len(), 1, "only one label set may be present");
        assert_eq!(points[0].value(), 10);

        let attributes: Vec<_> = points[0].attributes().cloned().collect();
        assert_eq!(attributes, vec![KeyValue::new("lbl1", "val1")]);

        Ok(())
    }

    #[tokio::test]
    async fn test_gauge_reading_is_idempotent() -> Result<()> {
        let (probe, exporter, provider) = in_memory_probe();
        probe.emit()?;

        // Collect twice more. The gauge callback must re-yield the same
        // single observation on every cycle.
        provider.force_flush()?;
        provider.force_flush()?;

        let snapshot = latest_snapshot(&exporter)?;
        let metric = snapshot
            .scope_metrics()
            .flat_map(|sm| sm.metrics())
            .find(|m| m.name() == GAUGE_NAME)
            .context("gauge was not exported")?;

        assert_eq!(metric.description(), "some gauge");
        assert_eq!(metric.unit(), "");

        let AggregatedMetrics::F64(MetricData::Gauge(gauge)) = metric.data() else {
            bail!("gauge should aggregate to an f64 gauge");
        };

        let points: Vec<_> = gauge.data_points().collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value(), 0.8);

        let attributes: Vec<_> = points[0].attributes().cloned().collect();
        assert_eq!(attributes, vec![KeyValue::new("lbl1", "val1")]);

        Ok(())
    }

    #[tokio::test]
    async fn test_counter_is_cumulative_across_collections() -> Result<()> {
        let (probe, exporter, provider) = in_memory_probe();
        probe.emit()?;

        // A later collection without new increments must still report the
        // same cumulative total, not another delta.
        provider.force_flush()?;

        let snapshot = latest_snapshot(&exporter)?;
        let metric = snapshot
            .scope_metrics()
            .flat_map(|sm| sm.metrics())
            .find(|m| m.name() == COUNTER_NAME)
            .context("counter was not exported")?;

        let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() else {
            bail!("counter should aggregate to a u64 sum");
        };
        let points: Vec<_> = sum.data_points().collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value(), 10);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_flushes_then_shuts_down() -> Result<()> {
        let (probe, exporter, provider) = in_memory_probe();
        probe.run().await?;

        // run() already flushed, so the full sample set must be in the
        // exporter by the time it returns.
        let snapshot = latest_snapshot(&exporter)?;
        let names: Vec<_> = snapshot
            .scope_metrics()
            .flat_map(|sm| sm.metrics())
            .map(|m| m.name().to_owned())
            .collect();
        assert!(names.contains(&COUNTER_NAME.to_owned()));
        assert!(names.contains(&GAUGE_NAME.to_owned()));

        // The pipeline was shut down before run() returned, later flushes
        // must be refused.
        assert!(provider.force_flush().is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_resource_service_name() -> Result<()> {
        let (probe, exporter, _provider) = in_memory_probe();
        probe.emit()?;

        let snapshot = latest_snapshot(&exporter)?;
        assert_eq!(
            snapshot.resource().get(&Key::from_static_str("service.name")),
            Some(Value::from("python-test"))
        );

        Ok(())
    }
}
