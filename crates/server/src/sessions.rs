//! Session API endpoints

use api_types::{
    Created, DateFilter,
    session::{
        CostInputs, ParticipantView, SessionDetailResponse, SessionListResponse, SessionPlan,
        SessionRecord, SessionRecorded, SessionStatus, SessionUpdate, SessionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Money, Quantity};
use uuid::Uuid;

use crate::{ServerError, server::{OrganizerScope, ServerState}};

fn cost_inputs(costs: CostInputs) -> Result<engine::CostInputs, ServerError> {
    let court_hours: Quantity = costs.court_hours.parse()?;
    Ok(engine::CostInputs {
        court_hours,
        court_rate: Money::new(costs.court_rate_minor),
        shuttlecock_count: costs.shuttlecock_count,
        shuttlecock_rate: Money::new(costs.shuttlecock_rate_minor),
        other_costs: Money::new(costs.other_costs_minor),
    })
}

fn map_status(status: engine::SessionStatus) -> SessionStatus {
    match status {
        engine::SessionStatus::Planned => SessionStatus::Planned,
        engine::SessionStatus::Completed => SessionStatus::Completed,
        engine::SessionStatus::Cancelled => SessionStatus::Cancelled,
    }
}

fn view(session: engine::Session) -> SessionView {
    SessionView {
        id: session.id,
        date: session.date,
        start_time: session.start_time,
        end_time: session.end_time,
        total_cost_minor: session.total_cost().minor(),
        cost_per_player_minor: session.cost_per_player().minor(),
        location: session.location,
        court_cost_minor: session.court_cost.minor(),
        shuttlecock_cost_minor: session.shuttlecock_cost.minor(),
        other_costs_minor: session.other_costs.minor(),
        participant_count: session.participant_count,
        status: map_status(session.status),
        notes: session.notes,
    }
}

fn recorded(session_id: Uuid, allocation: engine::Allocation, drop_ins: Vec<Uuid>) -> SessionRecorded {
    SessionRecorded {
        session_id,
        total_minor: allocation.total.minor(),
        cost_per_player_minor: allocation.cost_per_player.minor(),
        participants: allocation.participants,
        drop_in_player_ids: drop_ins,
    }
}

/// Records a completed session and bills its participants.
pub async fn record(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<SessionRecord>,
) -> Result<(StatusCode, Json<SessionRecorded>), ServerError> {
    let mut cmd = engine::RecordSessionCmd::new(&organizer_id, payload.date, cost_inputs(payload.costs)?)
        .participants(payload.participant_ids);
    for name in payload.drop_ins {
        cmd = cmd.drop_in(name);
    }
    cmd.meta = engine::SessionMeta {
        start_time: payload.start_time,
        end_time: payload.end_time,
        location: payload.location,
        notes: payload.notes,
    };

    let result = state.engine.record_session(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(recorded(
            result.session_id,
            result.allocation,
            result.drop_in_player_ids,
        )),
    ))
}

pub async fn plan(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<SessionPlan>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd =
        engine::PlanSessionCmd::new(&organizer_id, payload.date).expected(payload.expected_player_ids);
    cmd.meta.location = payload.location;
    cmd.meta.notes = payload.notes;

    let id = state.engine.plan_session(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn list(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Query(filter): Query<DateFilter>,
) -> Result<Json<SessionListResponse>, ServerError> {
    let sessions = state
        .engine
        .sessions(&organizer_id, engine::DateRange::new(filter.from, filter.to))
        .await?;

    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetailResponse>, ServerError> {
    let detail = state.engine.session(&organizer_id, id).await?;

    Ok(Json(SessionDetailResponse {
        session: view(detail.session),
        participants: detail
            .participants
            .into_iter()
            .map(|p| ParticipantView {
                player_id: p.player_id,
                amount_owed_minor: p.amount_owed.map(Money::minor),
            })
            .collect(),
    }))
}

/// Replaces costs and participants of a completed session.
pub async fn update(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SessionUpdate>,
) -> Result<Json<SessionRecorded>, ServerError> {
    let mut cmd = engine::UpdateSessionCmd::new(&organizer_id, id, cost_inputs(payload.costs)?)
        .participants(payload.participant_ids);
    for name in payload.drop_ins {
        cmd = cmd.drop_in(name);
    }
    if let Some(date) = payload.date {
        cmd = cmd.date(date);
    }
    cmd.meta = engine::SessionMeta {
        start_time: payload.start_time,
        end_time: payload.end_time,
        location: payload.location,
        notes: payload.notes,
    };

    let result = state.engine.update_session(cmd).await?;
    Ok(Json(recorded(
        result.session_id,
        result.allocation,
        result.drop_in_player_ids,
    )))
}

/// Bills the expected players of a planned session.
pub async fn complete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CostInputs>,
) -> Result<Json<SessionRecorded>, ServerError> {
    let allocation = state
        .engine
        .complete_session(&organizer_id, id, cost_inputs(payload)?)
        .await?;
    Ok(Json(recorded(id, allocation, Vec::new())))
}

pub async fn cancel(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.cancel_session(&organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_session(&organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
