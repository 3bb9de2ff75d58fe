use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;

use crate::cover::CoverRegistry;
use crate::handlers;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub covers: CoverRegistry,
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let api_v1 = Router::new()
        .route("/covers", get(handlers::v1::list_covers))
        .route("/covers/{slug}", get(handlers::v1::get_cover))
        .route("/covers/{slug}/open", post(handlers::v1::open_cover))
        .route("/covers/{slug}/close", post(handlers::v1::close_cover))
        .route("/covers/{slug}/stop", post(handlers::v1::stop_cover))
        .route("/covers/{slug}/update", post(handlers::v1::update_cover));

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .nest("/api/v1", api_v1)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}
