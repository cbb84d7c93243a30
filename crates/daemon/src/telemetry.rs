//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

/// Layer exporting spans; sits directly on the registry
pub type TelemetryLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the OpenTelemetry layer if an endpoint is configured
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: snapshot-publisher)
///
/// Runs before the subscriber exists, so failures are returned for the
/// caller to log once logging is up.
pub fn layer() -> Result<Option<TelemetryLayer>> {
    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => endpoint,
        Err(_) => return Ok(None),
    };

    #[cfg(feature = "telemetry")]
    {
        build_layer(&endpoint).map(Some)
    }

    #[cfg(not(feature = "telemetry"))]
    {
        anyhow::bail!(
            "OTLP endpoint {} set but feature 'telemetry' not enabled (rebuild with --features telemetry)",
            endpoint
        )
    }
}

#[cfg(feature = "telemetry")]
fn build_layer(endpoint: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "snapshot-publisher".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
