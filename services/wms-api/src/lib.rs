//! PostGIS-backed WMS and XYZ tile service.
//!
//! The binary in `main.rs` wires configuration and logging; [`app`] builds
//! the router so tests can drive it in-process.

pub mod backend;
pub mod config;
pub mod handlers;
pub mod layer_config;
pub mod metrics;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // WMS endpoints
        .route("/wms", get(handlers::wms_handler))
        .route("/wms/", get(handlers::wms_handler))
        // XYZ tiles
        .route("/tile/:layers/:z/:x/:y", get(handlers::tile_handler))
        // Health check
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        // Metrics
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
