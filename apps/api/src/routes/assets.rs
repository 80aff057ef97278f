//! Staged-asset routes: dereference and release resource handles.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::state::AppState;

/// GET /assets/:id
///
/// Serves the staged blob behind a handle. 404 once the handle has been
/// released or superseded.
pub async fn handle_fetch_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.resources.fetch(id) {
        Some(resource) => (
            [(header::CONTENT_TYPE, resource.content_type)],
            resource.bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// DELETE /assets/:id
///
/// Releases a handle when the owning view is done with it. Idempotent:
/// releasing an already-released handle is still a 204.
pub async fn handle_release_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    state.resources.release_id(id);
    StatusCode::NO_CONTENT
}
