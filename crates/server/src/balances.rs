//! Balance API endpoints

use api_types::balance::{
    BalanceKind, BalanceList, BalanceListResponse, BalanceView, Recomputed, SummaryView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::{BalanceFilter, Money};
use uuid::Uuid;

use crate::{ServerError, server::{OrganizerScope, ServerState}};

fn view(balance: engine::PlayerBalance) -> BalanceView {
    BalanceView {
        player_id: balance.player_id,
        total_owed_minor: balance.total_owed.minor(),
        total_paid_minor: balance.total_paid.minor(),
        current_balance_minor: balance.current_balance.minor(),
        last_session_date: balance.last_session_date,
        last_payment_date: balance.last_payment_date,
    }
}

fn filter(query: &BalanceList) -> BalanceFilter {
    let min = Money::new(query.min_minor.unwrap_or_default());
    match query.kind.unwrap_or_default() {
        BalanceKind::All => BalanceFilter::All,
        BalanceKind::Debtors => BalanceFilter::Debtors { min },
        BalanceKind::Creditors => BalanceFilter::Creditors { min },
    }
}

pub async fn list(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Query(query): Query<BalanceList>,
) -> Result<Json<BalanceListResponse>, ServerError> {
    let balances = state
        .engine
        .balances(&organizer_id, filter(&query))
        .await?;

    Ok(Json(BalanceListResponse {
        balances: balances.into_iter().map(view).collect(),
    }))
}

pub async fn get(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state.engine.player_balance(&organizer_id, player_id).await?;
    Ok(Json(view(balance)))
}

pub async fn summary(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
) -> Result<Json<SummaryView>, ServerError> {
    let summary = state.engine.financial_summary(&organizer_id).await?;

    Ok(Json(SummaryView {
        total_outstanding_minor: summary.total_outstanding.minor(),
        total_credit_minor: summary.total_credit.minor(),
        net_balance_minor: summary.net_balance.minor(),
        debtors: summary.debtors,
        creditors: summary.creditors,
        settled: summary.settled,
    }))
}

pub async fn recompute(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state
        .engine
        .recompute_player_balance(&organizer_id, player_id)
        .await?;
    Ok(Json(view(balance)))
}

pub async fn recompute_all(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
) -> Result<Json<Recomputed>, ServerError> {
    let players = state.engine.recompute_all_balances(&organizer_id).await?;
    Ok(Json(Recomputed { players }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_maps_to_filter() {
        let query = BalanceList {
            kind: Some(BalanceKind::Debtors),
            min_minor: Some(500),
        };
        assert_eq!(
            filter(&query),
            BalanceFilter::Debtors {
                min: Money::new(500)
            }
        );
        assert_eq!(filter(&BalanceList::default()), BalanceFilter::All);
    }
}
