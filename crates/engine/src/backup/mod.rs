//! Backup archives.
//!
//! An [`Archive`] is a self-describing JSON document holding every record of
//! one organizer. Records keep their original string ids; on import those ids
//! are remapped to freshly generated ones and relationships are rewired
//! through the mapping.
//!
//! Monetary fields are JSON numbers in major units (`18.5`), dates are
//! `YYYY-MM-DD`, timestamps RFC 3339.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Money, PaymentMethod, SessionStatus, locations, payments, player_balances, players,
    session_participants, sessions,
};

mod export;
mod import;
mod validate;

pub use validate::validate_archive;

/// Rows fetched per query while exporting.
pub const PAGE_SIZE: u64 = 1000;

/// Version tag written into archive metadata.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    #[default]
    FullBackup,
    DateRange,
    Selective,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub metadata: ArchiveMetadata,
    pub data: ArchiveData,
    #[serde(default)]
    pub statistics: ArchiveStatistics,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub export_date: DateTime<Utc>,
    pub app_version: String,
    pub organizer_id: String,
    pub total_records: u64,
    pub export_type: ExportType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveData {
    pub players: Vec<PlayerRecord>,
    pub sessions: Vec<SessionRecord>,
    pub session_participants: Vec<ParticipantRecord>,
    pub payments: Vec<PaymentRecord>,
    pub player_balances: Vec<BalanceRecord>,
    pub locations: Vec<LocationRecord>,
}

impl ArchiveData {
    pub fn total_records(&self) -> u64 {
        (self.players.len()
            + self.sessions.len()
            + self.session_participants.len()
            + self.payments.len()
            + self.player_balances.len()
            + self.locations.len()) as u64
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStatistics {
    pub date_range: SessionDateRange,
    pub totals: ArchiveTotals,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDateRange {
    pub earliest_session: Option<NaiveDate>,
    pub latest_session: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveTotals {
    pub total_sessions: u64,
    pub total_players: u64,
    pub total_payments: u64,
    /// Sum of exported payment amounts, rounded to one decimal place.
    pub total_amount_handled: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub organizer_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<locations::Model> for LocationRecord {
    fn from(model: locations::Model) -> Self {
        Self {
            id: model.id,
            organizer_id: model.organizer_id,
            name: model.name,
            address: model.address,
            notes: model.notes,
            created_at: Some(model.created_at),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub organizer_id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<players::Model> for PlayerRecord {
    fn from(model: players::Model) -> Self {
        Self {
            id: model.id,
            organizer_id: model.organizer_id,
            name: model.name,
            phone: model.phone,
            is_temporary: model.is_temporary,
            is_active: model.is_active,
            notes: model.notes,
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        }
    }
}

/// A session's raw inputs. Total and per-player cost are derived, so they
/// are not part of the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub organizer_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub location: Option<String>,
    pub court_cost: Money,
    pub shuttlecock_cost: Money,
    #[serde(default)]
    pub other_costs: Money,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<sessions::Model> for SessionRecord {
    type Error = crate::EngineError;

    fn try_from(model: sessions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            organizer_id: model.organizer_id,
            date: model.date,
            start_time: model.start_time,
            end_time: model.end_time,
            location: model.location,
            court_cost: Money::new(model.court_cost_minor),
            shuttlecock_cost: Money::new(model.shuttlecock_cost_minor),
            other_costs: Money::new(model.other_costs_minor),
            participant_count: u32::try_from(model.participant_count).unwrap_or_default(),
            status: SessionStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    #[serde(default)]
    pub amount_owed: Option<Money>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<session_participants::Model> for ParticipantRecord {
    fn from(model: session_participants::Model) -> Self {
        Self {
            id: model.id,
            session_id: model.session_id,
            player_id: model.player_id,
            amount_owed: model.amount_owed_minor.map(Money::new),
            created_at: Some(model.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub organizer_id: String,
    pub player_id: String,
    pub amount: Money,
    #[serde(default)]
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<payments::Model> for PaymentRecord {
    type Error = crate::EngineError;

    fn try_from(model: payments::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            organizer_id: model.organizer_id,
            player_id: model.player_id,
            amount: Money::new(model.amount_minor),
            method: PaymentMethod::try_from(model.method.as_str())?,
            payment_date: model.payment_date,
            reference_number: model.reference_number,
            notes: model.notes,
            created_at: Some(model.created_at),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub organizer_id: String,
    pub player_id: String,
    #[serde(default)]
    pub total_owed: Money,
    #[serde(default)]
    pub total_paid: Money,
    #[serde(default)]
    pub current_balance: Money,
    #[serde(default)]
    pub last_session_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<player_balances::Model> for BalanceRecord {
    fn from(model: player_balances::Model) -> Self {
        Self {
            organizer_id: model.organizer_id,
            player_id: model.player_id,
            total_owed: Money::new(model.total_owed_minor),
            total_paid: Money::new(model.total_paid_minor),
            current_balance: Money::new(model.current_balance_minor),
            last_session_date: model.last_session_date,
            last_payment_date: model.last_payment_date,
            updated_at: Some(model.updated_at),
        }
    }
}

/// What to export.
///
/// The range applies to sessions and payments only; locations, players and
/// balances are always exported in full.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub range: crate::DateRange,
    /// Export only these sessions (and their participants).
    #[serde(default)]
    pub session_ids: Option<Vec<uuid::Uuid>>,
}

impl ExportOptions {
    pub fn export_type(&self) -> ExportType {
        if self.session_ids.is_some() {
            ExportType::Selective
        } else if self.range.is_unbounded() {
            ExportType::FullBackup
        } else {
            ExportType::DateRange
        }
    }
}

/// What to do with an archive record whose natural key already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Keep the existing record.
    #[default]
    SkipDuplicates,
    /// Overwrite the existing record with the archived fields.
    ReplaceDuplicates,
    /// Keep existing non-empty fields and fill empty ones from the archive.
    MergeData,
}

/// Shared flag to abort an import between stages.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    #[serde(default)]
    pub conflict: ConflictMode,
    /// Validate and report what would happen without writing anything.
    #[serde(default)]
    pub validate_only: bool,
    /// Delete every record of the organizer before importing. Irreversible.
    #[serde(default)]
    pub clear_existing_data: bool,
    #[serde(skip)]
    pub cancel: Option<CancelFlag>,
}

/// Per-entity outcome of an import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub locations: EntityCounts,
    pub players: EntityCounts,
    pub sessions: EntityCounts,
    pub session_participants: EntityCounts,
    pub payments: EntityCounts,
    pub player_balances: EntityCounts,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    pub validate_only: bool,
    pub counts: ImportCounts,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: format!("archive rejected with {} error(s)", errors.len()),
            errors,
            ..Default::default()
        }
    }
}
