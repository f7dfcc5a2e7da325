use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// Custom error type
///
/// Every variant is fatal. Nothing is retried locally, errors propagate to
/// the binary entrypoint which logs them and exits with a non-zero status.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Required environment variable `{0}` is not set")]
    MissingEnv(String),

    #[error("Required environment variable `{0}` is set but empty")]
    EmptyEnv(String),

    #[error("Failed to build metric exporter: {0}")]
    ExporterBuild(#[source] anyhow::Error),

    #[error("Failed to flush metrics to the export transport: {0}")]
    Flush(#[source] OTelSdkError),

    #[error("Failed to shutdown meter provider: {0}")]
    Shutdown(#[source] OTelSdkError),
}
