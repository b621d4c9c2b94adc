//! Player API endpoints

use api_types::{
    Created,
    player::{PlayerActive, PlayerList, PlayerNew, PlayerUpdate, PlayerView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::{OrganizerScope, ServerState}};

fn view(player: engine::Player) -> PlayerView {
    PlayerView {
        id: player.id,
        name: player.name,
        phone: player.phone,
        is_temporary: player.is_temporary,
        is_active: player.is_active,
        notes: player.notes,
    }
}

pub async fn player_new(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<PlayerNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let id = state
        .engine
        .new_player(
            &organizer_id,
            &payload.name,
            payload.phone.as_deref(),
            payload.notes.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn list(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Query(query): Query<PlayerList>,
) -> Result<Json<Vec<PlayerView>>, ServerError> {
    let players = state
        .engine
        .players(&organizer_id, query.include_inactive.unwrap_or(false))
        .await?;

    Ok(Json(players.into_iter().map(view).collect()))
}

pub async fn get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerView>, ServerError> {
    let player = state.engine.player(&organizer_id, id).await?;
    Ok(Json(view(player)))
}

pub async fn update(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlayerUpdate>,
) -> Result<Json<PlayerView>, ServerError> {
    let player = state
        .engine
        .update_player(
            &organizer_id,
            id,
            engine::PlayerUpdate {
                name: payload.name,
                phone: payload.phone,
                notes: payload.notes,
                is_temporary: payload.is_temporary,
            },
        )
        .await?;

    Ok(Json(view(player)))
}

/// Deactivates (soft delete) or restores a player.
pub async fn set_active(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlayerActive>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_player_active(&organizer_id, id, payload.active)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_player(&organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
