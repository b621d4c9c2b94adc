//! Location API endpoints

use api_types::{
    Created,
    location::{LocationNew, LocationView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::{OrganizerScope, ServerState}};

pub async fn location_new(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<LocationNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let id = state
        .engine
        .new_location(
            &organizer_id,
            &payload.name,
            payload.address.as_deref(),
            payload.notes.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn list(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<LocationView>>, ServerError> {
    let locations = state
        .engine
        .locations(&organizer_id)
        .await?
        .into_iter()
        .map(|location| LocationView {
            id: location.id,
            name: location.name,
            address: location.address,
            notes: location.notes,
        })
        .collect();

    Ok(Json(locations))
}

pub async fn delete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_location(&organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
