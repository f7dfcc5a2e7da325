use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry_otlp::{WithExportConfig as _, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};

use crate::config::metric::{
    MetricExporterType, OtlpCommonExporterConfig, OtlpExporterProtocol, OtlpMetricExporterConfig,
};
use crate::error::ProbeError;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

impl MetricExporterType {
    pub(crate) fn instantiate(&self) -> Result<MetricExporterInstance, ProbeError> {
        self.instantiate_inner().map_err(ProbeError::ExporterBuild)
    }

    fn instantiate_inner(&self) -> Result<MetricExporterInstance> {
        match self {
            MetricExporterType::Stdout { step } => Ok(MetricExporterInstance::Stdout(
                *step,
                opentelemetry_stdout::MetricExporter::default(),
            )),
            MetricExporterType::Otlp(OtlpMetricExporterConfig {
                common:
                    OtlpCommonExporterConfig {
                        protocol,
                        endpoint,
                        headers,
                    },
                step,
            }) => {
                let exporter = match protocol {
                    OtlpExporterProtocol::HttpProtobuf | OtlpExporterProtocol::HttpJson => {
                        let mut builder = opentelemetry_otlp::MetricExporter::builder()
                            .with_http()
                            .with_endpoint(endpoint)
                            .with_protocol(match protocol {
                                OtlpExporterProtocol::HttpProtobuf => {
                                    opentelemetry_otlp::Protocol::HttpBinary
                                }
                                OtlpExporterProtocol::HttpJson => {
                                    opentelemetry_otlp::Protocol::HttpJson
                                }
                                OtlpExporterProtocol::Grpc => unreachable!(),
                            })
                            .with_timeout(EXPORT_TIMEOUT);
                        if let Some(headers) = headers {
                            builder = builder.with_headers(headers.clone())
                        }
                        builder
                            .build()
                            .context("Failed to create OTLP Http exporter")?
                    }
                    OtlpExporterProtocol::Grpc => {
                        let mut builder = opentelemetry_otlp::MetricExporter::builder()
                            .with_tonic()
                            .with_endpoint(endpoint)
                            .with_protocol(opentelemetry_otlp::Protocol::Grpc)
                            .with_compression(opentelemetry_otlp::Compression::Gzip)
                            .with_timeout(EXPORT_TIMEOUT);
                        if let Some(headers) = headers {
                            builder =
                                builder.with_metadata(tonic::metadata::MetadataMap::from_headers(
                                    http::HeaderMap::try_from(headers)
                                        .context("Failed to parse to HTTP headers")?,
                                ))
                        }
                        builder
                            .build()
                            .context("Failed to create OTLP gRPC exporter")?
                    }
                };
                Ok(MetricExporterInstance::Otlp(*step, exporter))
            }
        }
    }
}

pub(crate) enum MetricExporterInstance {
    Stdout(u64 /* step */, opentelemetry_stdout::MetricExporter),
    Otlp(u64 /* step */, opentelemetry_otlp::MetricExporter),
}

impl MetricExporterInstance {
    pub(crate) fn into_sdk_meter_provider(self) -> SdkMeterProvider {
        match self {
            MetricExporterInstance::Stdout(step, exporter) => build_provider(step, exporter),
            MetricExporterInstance::Otlp(step, exporter) => build_provider(step, exporter),
        }
    }
}

fn build_provider(step: u64, exporter: impl PushMetricExporter) -> SdkMeterProvider {
    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(step))
        .build();
    SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(crate::observability::otlp_resource())
        .build()
}
