use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

pub mod metric;

pub use metric::MetricExporterType;

/// Top-level configuration for one probe run.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    pub metric: MetricExporterType,
}

impl ProbeConfig {
    /// Assemble an OTLP/gRPC config from the `CX_ENDPOINT` and `CX_TOKEN`
    /// environment variables.
    pub fn from_env() -> Result<Self, ProbeError> {
        Ok(Self {
            metric: MetricExporterType::Otlp(metric::OtlpMetricExporterConfig::from_env()?),
        })
    }
}
