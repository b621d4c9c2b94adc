//! Command structs for engine operations.
//!
//! These types group parameters for write operations (sessions, payments,
//! transfers), keeping call sites readable and avoiding long argument lists.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{CostInputs, Money, PaymentMethod};

/// Optional descriptive fields shared by session commands.
#[derive(Clone, Debug, Default)]
pub struct SessionMeta {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Record a completed session and bill its participants.
#[derive(Clone, Debug)]
pub struct RecordSessionCmd {
    pub organizer_id: String,
    pub date: NaiveDate,
    pub costs: CostInputs,
    /// Existing players of the organizer.
    pub participant_ids: Vec<Uuid>,
    /// Drop-ins to create as temporary players and bill with the others.
    pub drop_in_names: Vec<String>,
    pub meta: SessionMeta,
}

impl RecordSessionCmd {
    #[must_use]
    pub fn new(organizer_id: impl Into<String>, date: NaiveDate, costs: CostInputs) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            date,
            costs,
            participant_ids: Vec::new(),
            drop_in_names: Vec::new(),
            meta: SessionMeta::default(),
        }
    }

    #[must_use]
    pub fn participants(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.participant_ids.extend(ids);
        self
    }

    #[must_use]
    pub fn drop_in(mut self, name: impl Into<String>) -> Self {
        self.drop_in_names.push(name.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.meta.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.meta.start_time = Some(start);
        self.meta.end_time = Some(end);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.meta.notes = Some(notes.into());
        self
    }
}

/// Create a planned session with its expected players (no charges yet).
#[derive(Clone, Debug)]
pub struct PlanSessionCmd {
    pub organizer_id: String,
    pub date: NaiveDate,
    pub expected_player_ids: Vec<Uuid>,
    pub meta: SessionMeta,
}

impl PlanSessionCmd {
    #[must_use]
    pub fn new(organizer_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            date,
            expected_player_ids: Vec::new(),
            meta: SessionMeta::default(),
        }
    }

    #[must_use]
    pub fn expected(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.expected_player_ids.extend(ids);
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.meta.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.meta.notes = Some(notes.into());
        self
    }
}

/// Replace the costs and the participant list of a session.
///
/// Descriptive fields left as `None` are kept as they are.
#[derive(Clone, Debug)]
pub struct UpdateSessionCmd {
    pub organizer_id: String,
    pub session_id: Uuid,
    pub costs: CostInputs,
    pub participant_ids: Vec<Uuid>,
    pub drop_in_names: Vec<String>,
    pub date: Option<NaiveDate>,
    pub meta: SessionMeta,
}

impl UpdateSessionCmd {
    #[must_use]
    pub fn new(organizer_id: impl Into<String>, session_id: Uuid, costs: CostInputs) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            session_id,
            costs,
            participant_ids: Vec::new(),
            drop_in_names: Vec::new(),
            date: None,
            meta: SessionMeta::default(),
        }
    }

    #[must_use]
    pub fn participants(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.participant_ids.extend(ids);
        self
    }

    #[must_use]
    pub fn drop_in(mut self, name: impl Into<String>) -> Self {
        self.drop_in_names.push(name.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Record a payment made by a player.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
    pub organizer_id: String,
    pub player_id: Uuid,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl PaymentCmd {
    #[must_use]
    pub fn new(
        organizer_id: impl Into<String>,
        player_id: Uuid,
        amount: Money,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            player_id,
            amount,
            method: PaymentMethod::Cash,
            payment_date,
            reference_number: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn reference_number(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Changes to an existing (non-transfer) payment. `None` keeps the value.
#[derive(Clone, Debug, Default)]
pub struct PaymentUpdate {
    pub amount: Option<Money>,
    pub method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

/// Move credit from one player to another.
#[derive(Clone, Debug)]
pub struct CreditTransferCmd {
    pub organizer_id: String,
    pub from_player_id: Uuid,
    pub to_player_id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

impl CreditTransferCmd {
    #[must_use]
    pub fn new(
        organizer_id: impl Into<String>,
        from_player_id: Uuid,
        to_player_id: Uuid,
        amount: Money,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            organizer_id: organizer_id.into(),
            from_player_id,
            to_player_id,
            amount,
            payment_date,
            notes: None,
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Changes to a credit transfer, applied to both legs. `None` keeps the value.
#[derive(Clone, Debug, Default)]
pub struct CreditTransferUpdate {
    pub amount: Option<Money>,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
