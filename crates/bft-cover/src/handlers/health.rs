use axum::extract::State;
use axum::http::StatusCode;

use crate::server::AppState;

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Ready once at least one cover is registered.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.covers.is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "no covers registered");
    }
    (StatusCode::OK, "ok")
}
