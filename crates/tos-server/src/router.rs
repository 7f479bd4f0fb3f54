use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all tos endpoints.
///
/// Service endpoints live under `/-/`, which no single-segment id can reach.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/-/healthz", get(handler::health))
        .route("/:id", get(handler::get_blob).post(handler::put_blob))
        .route("/:id/icon", get(handler::get_icon))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
