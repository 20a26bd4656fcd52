//! Feature API Service Library
//!
//! This crate provides the HTTP server that turns observation tables inside
//! remote spatial bundles into GeoJSON FeatureCollections, with a short-lived
//! response cache in front of the bundle reads.

pub mod config;
pub mod error;
pub mod handlers;
pub mod limits;
pub mod pipeline;
pub mod response_cache;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Features
        .route(
            "/api/features",
            get(handlers::features::features_handler)
                .head(handlers::features::method_not_allowed_handler)
                .fallback(handlers::features::method_not_allowed_handler),
        )
        // Cache introspection
        .route(
            "/api/cache/stats",
            get(handlers::cache_stats::cache_stats_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(Extension(state)),
        )
}
