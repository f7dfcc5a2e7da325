use opentelemetry_sdk::Resource;

pub mod metric;

/// `service.name` resource attribute carried by every exported measurement.
pub(crate) const SERVICE_NAME: &str = "python-test";

pub(crate) fn otlp_resource() -> Resource {
    Resource::builder().with_service_name(SERVICE_NAME).build()
}
