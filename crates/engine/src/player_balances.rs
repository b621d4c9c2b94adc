//! Per-player balance projection.
//!
//! One row per (organizer, player), derived entirely from session charges and
//! payments. Never edited directly: see `Engine::recompute_player_balance`.
//!
//! Sign convention for `current_balance = total_owed - total_paid`:
//! - positive: the player owes money
//! - zero: settled
//! - negative: the player is in credit

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Debtor,
    Settled,
    Creditor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBalance {
    pub organizer_id: String,
    pub player_id: Uuid,
    pub total_owed: Money,
    pub total_paid: Money,
    pub current_balance: Money,
    pub last_session_date: Option<NaiveDate>,
    pub last_payment_date: Option<NaiveDate>,
    /// `None` for a synthetic zero balance (no projection row yet).
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlayerBalance {
    /// Zero balance returned for players that have no projection row yet.
    pub fn zero(organizer_id: &str, player_id: Uuid) -> Self {
        Self {
            organizer_id: organizer_id.to_string(),
            player_id,
            total_owed: Money::ZERO,
            total_paid: Money::ZERO,
            current_balance: Money::ZERO,
            last_session_date: None,
            last_payment_date: None,
            updated_at: None,
        }
    }

    pub fn status(&self) -> BalanceStatus {
        if self.current_balance.is_positive() {
            BalanceStatus::Debtor
        } else if self.current_balance.is_negative() {
            BalanceStatus::Creditor
        } else {
            BalanceStatus::Settled
        }
    }

    /// True when the fact-derived fields match (ignores `updated_at`).
    pub(crate) fn same_facts(&self, other: &Self) -> bool {
        self.total_owed == other.total_owed
            && self.total_paid == other.total_paid
            && self.current_balance == other.current_balance
            && self.last_session_date == other.last_session_date
            && self.last_payment_date == other.last_payment_date
    }
}

/// Organizer-wide totals over all balance rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Sum of positive balances.
    pub total_outstanding: Money,
    /// Sum of the magnitudes of negative balances.
    pub total_credit: Money,
    /// `total_outstanding - total_credit`.
    pub net_balance: Money,
    pub debtors: u32,
    pub creditors: u32,
    pub settled: u32,
}

impl FinancialSummary {
    pub fn from_balances<'a>(balances: impl IntoIterator<Item = &'a PlayerBalance>) -> Self {
        let mut summary = Self::default();
        for balance in balances {
            match balance.status() {
                BalanceStatus::Debtor => {
                    summary.debtors += 1;
                    summary.total_outstanding =
                        summary.total_outstanding.saturating_add(balance.current_balance);
                }
                BalanceStatus::Creditor => {
                    summary.creditors += 1;
                    summary.total_credit =
                        summary.total_credit.saturating_add(balance.current_balance.abs());
                }
                BalanceStatus::Settled => summary.settled += 1,
            }
        }
        summary.net_balance = summary.total_outstanding.saturating_sub(summary.total_credit);
        summary
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "player_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub organizer_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub player_id: String,
    pub total_owed_minor: i64,
    pub total_paid_minor: i64,
    pub current_balance_minor: i64,
    pub last_session_date: Option<Date>,
    pub last_payment_date: Option<Date>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::PlayerId",
        to = "super::players::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Players,
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Players.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PlayerBalance> for ActiveModel {
    fn from(value: &PlayerBalance) -> Self {
        Self {
            organizer_id: ActiveValue::Set(value.organizer_id.clone()),
            player_id: ActiveValue::Set(value.player_id.to_string()),
            total_owed_minor: ActiveValue::Set(value.total_owed.minor()),
            total_paid_minor: ActiveValue::Set(value.total_paid.minor()),
            current_balance_minor: ActiveValue::Set(value.current_balance.minor()),
            last_session_date: ActiveValue::Set(value.last_session_date),
            last_payment_date: ActiveValue::Set(value.last_payment_date),
            updated_at: ActiveValue::Set(value.updated_at.unwrap_or_else(Utc::now)),
        }
    }
}

impl TryFrom<Model> for PlayerBalance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            player_id: parse_uuid(&model.player_id, "player")?,
            organizer_id: model.organizer_id,
            total_owed: Money::new(model.total_owed_minor),
            total_paid: Money::new(model.total_paid_minor),
            current_balance: Money::new(model.current_balance_minor),
            last_session_date: model.last_session_date,
            last_payment_date: model.last_payment_date,
            updated_at: Some(model.updated_at),
        })
    }
}
