//! Organizer API endpoints

use api_types::organizer::{OrganizerNew, OrganizerView};
use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{ServerError, server::{OrganizerScope, ServerState}};

/// Creates a new organizer scope. Needs no `organizer-id` header.
pub async fn organizer_new(
    State(state): State<ServerState>,
    Json(payload): Json<OrganizerNew>,
) -> Result<(StatusCode, Json<OrganizerView>), ServerError> {
    let id = state.engine.new_organizer(&payload.name).await?;
    let organizer = state.engine.organizer(&id).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrganizerView {
            id: organizer.id,
            name: organizer.name,
        }),
    ))
}

/// Returns the organizer of the request scope.
pub async fn get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
) -> Result<Json<OrganizerView>, ServerError> {
    let organizer = state.engine.organizer(&organizer_id).await?;

    Ok(Json(OrganizerView {
        id: organizer.id,
        name: organizer.name,
    }))
}
