//! Cover HTTP handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::cover::{CommandOutcome, CoverAttributes, CoverController, CoverError};
use crate::gate::GateCommand;
use crate::response;
use crate::server::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ListCoversResponse {
    covers: Vec<CoverAttributes>,
}

#[derive(Serialize)]
pub struct CommandResponse {
    command: GateCommand,
    outcome: CommandOutcome,
    cover: CoverAttributes,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/covers
pub async fn list_covers(State(state): State<AppState>) -> Json<ListCoversResponse> {
    Json(ListCoversResponse {
        covers: state.covers.attributes().await,
    })
}

/// GET /api/v1/covers/{slug}
pub async fn get_cover(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(cover) = state.covers.get(&slug) else {
        return cover_not_found(&slug);
    };
    (StatusCode::OK, Json(cover.attributes().await)).into_response()
}

/// POST /api/v1/covers/{slug}/open
pub async fn open_cover(state: State<AppState>, slug: Path<String>) -> Response {
    run_command(state, slug, GateCommand::Open).await
}

/// POST /api/v1/covers/{slug}/close
pub async fn close_cover(state: State<AppState>, slug: Path<String>) -> Response {
    run_command(state, slug, GateCommand::Close).await
}

/// POST /api/v1/covers/{slug}/stop
pub async fn stop_cover(state: State<AppState>, slug: Path<String>) -> Response {
    run_command(state, slug, GateCommand::Stop).await
}

/// POST /api/v1/covers/{slug}/update
///
/// Polls the gate immediately. Always succeeds; an unreachable gate is
/// reported as offline in the returned attributes.
pub async fn update_cover(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(cover) = state.covers.get(&slug) else {
        return cover_not_found(&slug);
    };
    cover.update().await;
    (StatusCode::OK, Json(cover.attributes().await)).into_response()
}

// ============================================================================
// Helpers
// ============================================================================

async fn run_command(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    command: GateCommand,
) -> Response {
    let Some(cover) = state.covers.get(&slug) else {
        return cover_not_found(&slug);
    };

    match dispatch(cover, command).await {
        Ok(outcome) => {
            let response = CommandResponse {
                command,
                outcome,
                cover: cover.attributes().await,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e @ CoverError::Disposed(_)) => response::conflict(e.to_string()),
        Err(e) => {
            warn!(cover = %slug, command = %command, error = %e, "Command failed");
            response::bad_gateway(format!("{} failed: {}", command, e))
        }
    }
}

async fn dispatch(
    cover: &CoverController,
    command: GateCommand,
) -> Result<CommandOutcome, CoverError> {
    match command {
        GateCommand::Open => cover.open().await,
        GateCommand::Close => cover.close().await,
        GateCommand::Stop => cover.stop().await,
    }
}

fn cover_not_found(slug: &str) -> Response {
    response::not_found(format!("Cover '{}' not found", slug))
}

// ============================================================================
// Tests
// ============================================================================
