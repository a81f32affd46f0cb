use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipyard_backend::{api::AppState, config::Config, create_router, k8s::K8sClient};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("Starting Shipyard Backend");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        namespace = %config.cluster.namespace,
        since_seconds = config.log_output.since_seconds,
        tail_lines = config.log_output.tail_lines,
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let k8s = K8sClient::new(&config.cluster.namespace).await?;
    match k8s.health_check().await {
        Ok(version) => tracing::info!(%version, "Connected to Kubernetes cluster"),
        Err(e) => tracing::warn!(error = %e, "Kubernetes cluster not reachable yet"),
    }

    let state = AppState::new(config.clone(), Arc::new(k8s)).with_metrics(metrics);
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Text logs by default, JSON lines when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
