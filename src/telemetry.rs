use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace::TracerProvider};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Service name attached to every exported span.
pub const SERVICE_NAME: &str = "spacetraders-inventory";

// ------------------------------------------------------------
// Span pipeline
// ------------------------------------------------------------
//
// `log` records keep going to env_logger. `tracing` spans and
// events go through this subscriber:
// - fmt layer on stderr, filtered by RUST_LOG (default "info")
// - OTLP/HTTP exporter when JAEGER_URL is set
//
// JAEGER_URL is the full traces url of the collector, e.g.
// http://jaeger:4318/v1/traces
//
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Flushes pending spans. No-op when nothing is exported.
    pub async fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };

        let flushed = tokio::task::spawn_blocking(move || provider.shutdown()).await;
        match flushed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("span exporter shutdown failed: {}", e),
            Err(e) => log::warn!("span exporter shutdown panicked: {}", e),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Must run inside the tokio runtime: the batch exporter spawns
/// its worker there.
pub fn init(trace_endpoint: Option<&str>) -> anyhow::Result<Telemetry> {
    let provider = trace_endpoint.map(tracer_provider).transpose()?;

    let otel_layer = provider.as_ref().map(|p| {
        opentelemetry::global::set_tracer_provider(p.clone());
        tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME))
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    Ok(Telemetry { provider })
}

fn tracer_provider(endpoint: &str) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .with_context(|| format!("failed to build span exporter for {endpoint}"))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build())
}

/// Filter directives from `raw`, "info" when unset or invalid.
fn env_filter(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|r| EnvFilter::try_new(r).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
