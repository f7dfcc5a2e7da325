use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Environment variable holding the collector endpoint address.
pub const ENDPOINT_ENV: &str = "CX_ENDPOINT";

/// Environment variable holding the bearer token for the collector.
pub const TOKEN_ENV: &str = "CX_TOKEN";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum MetricExporterType {
    /// Print collected metrics to the console instead of shipping them
    /// anywhere. Useful for checking the emitted sample set without
    /// credentials.
    #[serde(rename = "stdout")]
    Stdout {
        #[serde(default = "default_step")]
        step: u64,
    },

    /// Exporting in the OpenTelemetry Protocol (OTLP) format
    #[serde(rename = "otlp")]
    Otlp(OtlpMetricExporterConfig),
}

// serde ignores `deny_unknown_fields` on structs that use `flatten`, so the
// attribute is left off here. Unknown keys in the otlp variant are tolerated.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OtlpMetricExporterConfig {
    #[serde(flatten)]
    pub common: OtlpCommonExporterConfig,
    #[serde(default = "default_step")]
    pub step: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OtlpCommonExporterConfig {
    pub protocol: OtlpExporterProtocol,
    pub headers: Option<HashMap<String, String>>,
    pub endpoint: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum OtlpExporterProtocol {
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
    #[serde(rename = "http/json")]
    HttpJson,
    #[serde(rename = "grpc")]
    Grpc,
}

impl OtlpMetricExporterConfig {
    /// OTLP/gRPC config sourced from [`ENDPOINT_ENV`] and [`TOKEN_ENV`].
    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_env_named(ENDPOINT_ENV, TOKEN_ENV)
    }

    /// Same as [`Self::from_env`] but with caller-supplied variable names.
    ///
    /// Fails fast when either variable is unset or empty, so a malformed
    /// `Bearer ` header can never reach the collector.
    pub fn from_env_named(endpoint_var: &str, token_var: &str) -> Result<Self, ProbeError> {
        let endpoint = require_env(endpoint_var)?;
        let token = require_env(token_var)?;

        let headers = HashMap::from([("authorization".to_owned(), format!("Bearer {token}"))]);

        Ok(Self {
            common: OtlpCommonExporterConfig {
                protocol: OtlpExporterProtocol::Grpc,
                headers: Some(headers),
                endpoint: normalize_endpoint(&endpoint),
            },
            step: default_step(),
        })
    }
}

fn require_env(var: &str) -> Result<String, ProbeError> {
    match std::env::var(var) {
        Ok(value) if value.is_empty() => Err(ProbeError::EmptyEnv(var.to_owned())),
        Ok(value) => Ok(value),
        Err(_) => Err(ProbeError::MissingEnv(var.to_owned())),
    }
}

/// Collector endpoints are usually handed out as a bare `host:port`. The
/// exporter requires a scheme, assume TLS unless one is already present.
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_owned()
    } else {
        format!("https://{endpoint}")
    }
}

fn default_step() -> u64 {
    60
}
