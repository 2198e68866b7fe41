//! src/telemetry.rs
use crate::configuration::JobSettings;
use opentelemetry::trace::TracerProvider as _;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber: an env-filtered fmt layer plus an OTLP
/// span exporter. The exported resource is tagged with the process role
/// (coordinator or worker) and the job it serves, so one collector can tell
/// a fleet of workers apart.
pub fn init_tracing(
    service_name: &str,
    job: &JobSettings,
) -> anyhow::Result<opentelemetry_sdk::trace::SdkTracerProvider> {
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(opentelemetry::KeyValue::new("job.name", job.name.clone()))
        .with_attribute(opentelemetry::KeyValue::new(
            "job.n_reduce",
            job.n_reduce as i64,
        ))
        .build();
    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .build()?,
        )
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer(service_name.to_string());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(false),
        )
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    Ok(tracer_provider)
}
