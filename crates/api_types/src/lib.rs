use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response body for every create endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

/// Inclusive date filter used by list endpoints (query string).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DateFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub mod organizer {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrganizerNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrganizerView {
        pub id: String,
        pub name: String,
    }
}

pub mod location {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LocationNew {
        pub name: String,
        pub address: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LocationView {
        pub id: Uuid,
        pub name: String,
        pub address: Option<String>,
        pub notes: Option<String>,
    }
}

pub mod player {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PlayerNew {
        pub name: String,
        pub phone: Option<String>,
        pub notes: Option<String>,
    }

    /// Fields left out keep their current value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PlayerUpdate {
        pub name: Option<String>,
        pub phone: Option<String>,
        pub notes: Option<String>,
        /// `false` promotes a drop-in to a regular player.
        pub is_temporary: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PlayerActive {
        pub active: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PlayerList {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PlayerView {
        pub id: Uuid,
        pub name: String,
        pub phone: Option<String>,
        pub is_temporary: bool,
        pub is_active: bool,
        pub notes: Option<String>,
    }
}

pub mod session {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SessionStatus {
        Planned,
        Completed,
        Cancelled,
    }

    /// Raw cost inputs of a session.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CostInputs {
        /// Decimal hours, e.g. `"1.5"`.
        pub court_hours: String,
        pub court_rate_minor: i64,
        pub shuttlecock_count: u32,
        pub shuttlecock_rate_minor: i64,
        #[serde(default)]
        pub other_costs_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionRecord {
        pub date: NaiveDate,
        pub costs: CostInputs,
        #[serde(default)]
        pub participant_ids: Vec<Uuid>,
        /// Names of drop-ins, created as temporary players.
        #[serde(default)]
        pub drop_ins: Vec<String>,
        pub start_time: Option<NaiveTime>,
        pub end_time: Option<NaiveTime>,
        pub location: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionPlan {
        pub date: NaiveDate,
        #[serde(default)]
        pub expected_player_ids: Vec<Uuid>,
        pub location: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionUpdate {
        pub costs: CostInputs,
        #[serde(default)]
        pub participant_ids: Vec<Uuid>,
        #[serde(default)]
        pub drop_ins: Vec<String>,
        pub date: Option<NaiveDate>,
        pub start_time: Option<NaiveTime>,
        pub end_time: Option<NaiveTime>,
        pub location: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionRecorded {
        pub session_id: Uuid,
        pub total_minor: i64,
        pub cost_per_player_minor: i64,
        pub participants: usize,
        pub drop_in_player_ids: Vec<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionView {
        pub id: Uuid,
        pub date: NaiveDate,
        pub start_time: Option<NaiveTime>,
        pub end_time: Option<NaiveTime>,
        pub location: Option<String>,
        pub court_cost_minor: i64,
        pub shuttlecock_cost_minor: i64,
        pub other_costs_minor: i64,
        pub total_cost_minor: i64,
        pub cost_per_player_minor: i64,
        pub participant_count: u32,
        pub status: SessionStatus,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub player_id: Uuid,
        /// Absent while the session is planned or after it was cancelled.
        pub amount_owed_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionDetailResponse {
        pub session: SessionView,
        pub participants: Vec<ParticipantView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionListResponse {
        pub sessions: Vec<SessionView>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        #[default]
        Cash,
        Paynow,
        BankTransfer,
        CreditTransfer,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub player_id: Uuid,
        /// Negative for money given back to the player.
        pub amount_minor: i64,
        #[serde(default)]
        pub method: PaymentMethod,
        pub payment_date: NaiveDate,
        pub reference_number: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentUpdate {
        pub amount_minor: Option<i64>,
        pub method: Option<PaymentMethod>,
        pub payment_date: Option<NaiveDate>,
        pub reference_number: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentList {
        pub player_id: Option<Uuid>,
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub player_id: Uuid,
        pub amount_minor: i64,
        pub method: PaymentMethod,
        pub payment_date: NaiveDate,
        pub reference_number: Option<String>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentListResponse {
        pub payments: Vec<PaymentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CreditTransferNew {
        pub from_player_id: Uuid,
        pub to_player_id: Uuid,
        /// Must be > 0.
        pub amount_minor: i64,
        pub payment_date: NaiveDate,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CreditTransferUpdate {
        pub amount_minor: Option<i64>,
        pub payment_date: Option<NaiveDate>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CreditTransferView {
        pub reference_number: String,
        pub from_player_id: Uuid,
        pub to_player_id: Uuid,
        pub amount_minor: i64,
        pub payment_date: NaiveDate,
        pub notes: Option<String>,
    }

    /// References of transfers whose legs do not pair up.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferCheck {
        pub broken: Vec<String>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BalanceKind {
        #[default]
        All,
        Debtors,
        Creditors,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BalanceList {
        pub kind: Option<BalanceKind>,
        /// Minimum magnitude for debtors/creditors.
        pub min_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub player_id: Uuid,
        pub total_owed_minor: i64,
        pub total_paid_minor: i64,
        /// Positive: the player owes. Negative: the player is in credit.
        pub current_balance_minor: i64,
        pub last_session_date: Option<NaiveDate>,
        pub last_payment_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceListResponse {
        pub balances: Vec<BalanceView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        pub total_outstanding_minor: i64,
        pub total_credit_minor: i64,
        pub net_balance_minor: i64,
        pub debtors: u32,
        pub creditors: u32,
        pub settled: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Recomputed {
        pub players: usize,
    }
}

pub mod backup {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConflictMode {
        #[default]
        SkipDuplicates,
        ReplaceDuplicates,
        MergeData,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ImportRequest {
        /// The archive document as produced by the export endpoint.
        pub archive: serde_json::Value,
        #[serde(default)]
        pub conflict: ConflictMode,
        #[serde(default)]
        pub validate_only: bool,
        #[serde(default)]
        pub clear_existing_data: bool,
    }
}
