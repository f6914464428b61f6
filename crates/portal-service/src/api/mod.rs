pub mod routes;

use crate::state::PortalState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: PortalState) -> Router {
    Router::new()
        .route("/ping", get(routes::ping))
        .route("/check", post(routes::check))
        .route("/check/result", get(routes::poll_result))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
