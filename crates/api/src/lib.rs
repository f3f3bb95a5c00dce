//! HTTP API server with observability for the inventory ledger.
//!
//! Provides REST endpoints for the product catalog, stock changes, ledger
//! queries, notifications and reports, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ledger_store::InventoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::{AppState, create_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/products",
            post(routes::products::create::<S>).get(routes::products::list::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).patch(routes::products::update::<S>),
        )
        .route("/products/{id}/stock", post(routes::products::change_stock::<S>))
        .route("/products/{id}/history", get(routes::products::history::<S>))
        .route(
            "/products/{id}/consistency",
            get(routes::products::consistency::<S>),
        )
        .route("/ledger", get(routes::ledger::query::<S>))
        .route("/notifications", get(routes::notifications::list::<S>))
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read::<S>),
        )
        .route("/reports/{report_type}", get(routes::reports::generate::<S>))
        .route("/admin/ledger/purge", post(routes::admin::purge_ledger::<S>))
        .route_layer(axum::middleware::from_fn(middleware::track_metrics))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
