//! Payment and credit transfer API endpoints

use api_types::{
    Created,
    payment::{
        CreditTransferNew, CreditTransferUpdate, CreditTransferView, PaymentList,
        PaymentListResponse, PaymentMethod, PaymentNew, PaymentUpdate, PaymentView, TransferCheck,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::Money;
use uuid::Uuid;

use crate::{ServerError, server::{OrganizerScope, ServerState}};

fn map_method(method: engine::PaymentMethod) -> PaymentMethod {
    match method {
        engine::PaymentMethod::Cash => PaymentMethod::Cash,
        engine::PaymentMethod::Paynow => PaymentMethod::Paynow,
        engine::PaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        engine::PaymentMethod::CreditTransfer => PaymentMethod::CreditTransfer,
        engine::PaymentMethod::Other => PaymentMethod::Other,
    }
}

fn engine_method(method: PaymentMethod) -> engine::PaymentMethod {
    match method {
        PaymentMethod::Cash => engine::PaymentMethod::Cash,
        PaymentMethod::Paynow => engine::PaymentMethod::Paynow,
        PaymentMethod::BankTransfer => engine::PaymentMethod::BankTransfer,
        PaymentMethod::CreditTransfer => engine::PaymentMethod::CreditTransfer,
        PaymentMethod::Other => engine::PaymentMethod::Other,
    }
}

fn view(payment: engine::Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        player_id: payment.player_id,
        amount_minor: payment.amount.minor(),
        method: map_method(payment.method),
        payment_date: payment.payment_date,
        reference_number: payment.reference_number,
        notes: payment.notes,
    }
}

fn transfer_view(transfer: engine::CreditTransfer) -> CreditTransferView {
    CreditTransferView {
        reference_number: transfer.reference_number,
        from_player_id: transfer.from_player_id,
        to_player_id: transfer.to_player_id,
        amount_minor: transfer.amount.minor(),
        payment_date: transfer.payment_date,
        notes: transfer.notes,
    }
}

pub async fn payment_new(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = engine::PaymentCmd::new(
        &organizer_id,
        payload.player_id,
        Money::new(payload.amount_minor),
        payload.payment_date,
    )
    .method(engine_method(payload.method));
    cmd.reference_number = payload.reference_number;
    cmd.notes = payload.notes;

    let id = state.engine.record_payment(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn list(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Query(query): Query<PaymentList>,
) -> Result<Json<PaymentListResponse>, ServerError> {
    let payments = state
        .engine
        .payments(
            &organizer_id,
            query.player_id,
            engine::DateRange::new(query.from, query.to),
        )
        .await?;

    Ok(Json(PaymentListResponse {
        payments: payments.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state.engine.payment(&organizer_id, id).await?;
    Ok(Json(view(payment)))
}

pub async fn update(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentUpdate>,
) -> Result<Json<PaymentView>, ServerError> {
    let payment = state
        .engine
        .update_payment(
            &organizer_id,
            id,
            engine::PaymentUpdate {
                amount: payload.amount_minor.map(Money::new),
                method: payload.method.map(engine_method),
                payment_date: payload.payment_date,
                reference_number: payload.reference_number,
                notes: payload.notes,
            },
        )
        .await?;

    Ok(Json(view(payment)))
}

pub async fn delete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_payment(&organizer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Moves credit from one player to another.
pub async fn transfer_new(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<CreditTransferNew>,
) -> Result<(StatusCode, Json<CreditTransferView>), ServerError> {
    let mut cmd = engine::CreditTransferCmd::new(
        &organizer_id,
        payload.from_player_id,
        payload.to_player_id,
        Money::new(payload.amount_minor),
        payload.payment_date,
    );
    cmd.notes = payload.notes;

    let transfer = state.engine.transfer_credit(cmd).await?;
    Ok((StatusCode::CREATED, Json(transfer_view(transfer))))
}

pub async fn transfer_get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<Json<CreditTransferView>, ServerError> {
    let transfer = state
        .engine
        .credit_transfer(&organizer_id, &reference)
        .await?;
    Ok(Json(transfer_view(transfer)))
}

pub async fn transfer_update(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(reference): Path<String>,
    Json(payload): Json<CreditTransferUpdate>,
) -> Result<Json<CreditTransferView>, ServerError> {
    let transfer = state
        .engine
        .update_credit_transfer(
            &organizer_id,
            &reference,
            engine::CreditTransferUpdate {
                amount: payload.amount_minor.map(Money::new),
                payment_date: payload.payment_date,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(transfer_view(transfer)))
}

pub async fn transfer_delete(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_credit_transfer(&organizer_id, &reference)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists transfers whose two legs no longer pair up.
pub async fn transfer_check(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
) -> Result<Json<TransferCheck>, ServerError> {
    let broken = state.engine.verify_credit_transfers(&organizer_id).await?;
    Ok(Json(TransferCheck { broken }))
}
