//! Shipyard Backend Library
//!
//! Deploys containerized applications to Kubernetes and reports on their
//! state: a deploy saga with rollback, a per-application status view and a
//! container log report.

pub mod api;
pub mod config;
pub mod error;
pub mod k8s;
pub mod models;

use axum::http::{header, Method};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::AppState;

/// Create the application router with the given state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Deployment saga
        .route("/api/apps", post(api::deploy::deploy))
        .route("/api/apps/:app_code", delete(api::deploy::delete))
        // Status
        .route("/api/status", get(api::status::all_status))
        .route("/api/deployments", get(api::status::deployments))
        // Logs
        .route("/api/pods/:pod_name/logs", post(api::logs::container_logs))
        // Metrics (Prometheus)
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Create CORS layer with secure configuration
fn cors_layer() -> CorsLayer {
    // Allow origins from environment or default to localhost for development
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}
