//! API routes.

use axum::middleware;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    delete_thumbnail, get_thumbnail, get_thumbnail_meta, get_video_diagnostics, health,
    list_diagnostics, ready,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let thumbnail_routes = Router::new()
        .route(
            "/thumbnails/:video_id",
            get(get_thumbnail).delete(delete_thumbnail),
        )
        .route("/thumbnails/:video_id/meta", get(get_thumbnail_meta));

    let diagnostic_routes = Router::new()
        .route("/diagnostics", get(list_diagnostics))
        .route("/diagnostics/:video_id", get(get_video_diagnostics));

    let api_routes = Router::new()
        .merge(thumbnail_routes)
        .merge(diagnostic_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
