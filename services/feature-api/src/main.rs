//! Feature API Server
//!
//! Serves GeoJSON features resolved on demand from remote spatial bundles.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use feature_api::config::FeatureApiConfig;
use feature_api::state::AppState;

/// Feature API Server
#[derive(Parser, Debug)]
#[command(name = "feature-api")]
#[command(about = "GeoJSON features from remote spatial bundles")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8085", env = "FEATURE_API_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "FEATURE_API_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Configuration file
    #[arg(short, long, default_value = "config/feature-api.yaml", env = "FEATURE_API_CONFIG")]
    config: String,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting feature API server");

    let config = FeatureApiConfig::load(&args.config)?;
    info!(
        max_limit = config.limits.max_limit,
        ttl_secs = config.cache.ttl_secs,
        timeout_secs = config.upstream.timeout_secs,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config).with_metrics(prometheus_handle));
    let app = feature_api::router(state);

    // Parse listen address
    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Feature API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
        })
        .await
        .context("Server failed")
}
