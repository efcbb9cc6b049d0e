// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:     Configuration read from the environment
// - schema:     Strongly typed game API payloads
// - util:       Shared helper utilities (cycle timing)
// - api:        Game API transport, decoding and session
// - metrics:    Gauge sink and process-wide registry
// - exposition: Pull-based /metrics HTTP endpoint
// - telemetry:  Tracing subscriber and optional span export
// - collector:  Poll loop (fetch + publish + sleep)
//
mod api;
mod collector;
mod config;
mod exposition;
mod metrics;
mod schema;
mod telemetry;
mod util;

// ------------------------------------------------------------
// External dependencies
// ------------------------------------------------------------

use anyhow::Context;
use prometheus::Registry;
use rustls::crypto::{CryptoProvider, ring};

use api::{Endpoints, ReqwestClient, RetryingTransport, Session};
use collector::Collector;
use config::Config;
use metrics::{PrometheusSink, REGISTRY};

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize cryptography backend (rustls)
// - Initialize logging
// - Load configuration
// - Install the tracing subscriber (span export when JAEGER_URL is set)
// - Register gauges and start the /metrics endpoint
// - Log in and run the collector loop
//
// Any error ends the process with status 1.
//
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // --------------------------------------------------------
    // rustls >= 0.23 requires an explicit CryptoProvider
    // installation, once, before any TLS client is built.
    // --------------------------------------------------------
    CryptoProvider::install_default(ring::default_provider())
        .map_err(|_| anyhow::anyhow!("failed to install rustls CryptoProvider"))?;

    let config = Config::from_env().context("failed to load configuration")?;
    log::info!("{:?}", config);

    let telemetry = telemetry::init(config.trace_endpoint.as_deref())?;
    match &config.trace_endpoint {
        Some(url) if telemetry.is_exporting() => log::info!("exporting spans to {}", url),
        _ => log::info!("JAEGER_URL not set, spans are not exported"),
    }

    // Pending spans are flushed whatever the outcome.
    let result = collect(config).await;
    telemetry.shutdown().await;
    result
}

async fn collect(config: Config) -> anyhow::Result<()> {
    // --------------------------------------------------------
    // Metrics: one registry, written by the collector,
    // read by the /metrics endpoint.
    // --------------------------------------------------------
    let registry = Registry::clone(&REGISTRY);
    let sink = PrometheusSink::register(&registry).context("failed to register gauges")?;

    let server = tokio::spawn(exposition::serve(config.metrics_port, registry));

    // --------------------------------------------------------
    // Login
    // --------------------------------------------------------
    let client = ReqwestClient::new(config.request_timeout()).context("failed to build HTTP client")?;
    let transport = RetryingTransport::new(client, config.retry_policy());
    let endpoints = Endpoints::new(&config.api_base_url, &config.token);

    let session = Session::open(transport, endpoints)
        .await
        .context("login failed")?;
    log::info!("User logged in: {}", session.details().username);

    // --------------------------------------------------------
    // Collector loop and metrics endpoint run side by side.
    // Whichever stops first ends the process.
    // --------------------------------------------------------
    let mut collector = Collector::new(session, sink, config.poll_interval());

    tokio::select! {
        result = collector.run() => result,
        joined = server => match joined {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("metrics endpoint task panicked: {e}")),
        },
    }
}
