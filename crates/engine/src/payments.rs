//! Payments.
//!
//! A payment is money a player handed over (positive amount) or money given
//! back (negative amount). Credit transfers between two players are stored
//! as two `credit_transfer` legs sharing a reference number: the giving
//! player's leg is negative, the receiving player's leg is positive.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Paynow,
    BankTransfer,
    CreditTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Paynow => "paynow",
            Self::BankTransfer => "bank_transfer",
            Self::CreditTransfer => "credit_transfer",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "paynow" => Ok(Self::Paynow),
            "bank_transfer" => Ok(Self::BankTransfer),
            "credit_transfer" => Ok(Self::CreditTransfer),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidPayment(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub organizer_id: String,
    pub player_id: Uuid,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        organizer_id: &str,
        player_id: Uuid,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
    ) -> Result<Self, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "payment amount must not be zero".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            organizer_id: organizer_id.to_string(),
            player_id,
            amount,
            method,
            payment_date,
            reference_number: None,
            notes: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_transfer_leg(&self) -> bool {
        self.method == PaymentMethod::CreditTransfer
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub organizer_id: String,
    pub player_id: String,
    pub amount_minor: i64,
    pub method: String,
    pub payment_date: Date,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::PlayerId",
        to = "super::players::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Players,
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Players.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(value: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            organizer_id: ActiveValue::Set(value.organizer_id.clone()),
            player_id: ActiveValue::Set(value.player_id.to_string()),
            amount_minor: ActiveValue::Set(value.amount.minor()),
            method: ActiveValue::Set(value.method.as_str().to_string()),
            payment_date: ActiveValue::Set(value.payment_date),
            reference_number: ActiveValue::Set(value.reference_number.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            organizer_id: model.organizer_id,
            player_id: parse_uuid(&model.player_id, "player")?,
            amount: Money::new(model.amount_minor),
            method: PaymentMethod::try_from(model.method.as_str())?,
            payment_date: model.payment_date,
            reference_number: model.reference_number,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}

/// An internal movement of credit from one player to another.
///
/// Stored as two payment legs; this is the view the engine hands out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransfer {
    pub reference_number: String,
    pub from_player_id: Uuid,
    pub to_player_id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

impl CreditTransfer {
    /// Rebuilds a transfer from its two legs, checking they pair up.
    pub(crate) fn from_legs(legs: &[Payment]) -> Result<Self, EngineError> {
        let [a, b] = legs else {
            return Err(EngineError::InvalidPayment(format!(
                "credit transfer must have exactly 2 legs, found {}",
                legs.len()
            )));
        };
        let (debit, credit) = if a.amount.is_negative() { (a, b) } else { (b, a) };
        let reference = debit.reference_number.clone().unwrap_or_default();
        if !debit.amount.is_negative()
            || !credit.amount.is_positive()
            || debit.amount != -credit.amount
            || credit.reference_number.as_deref() != Some(reference.as_str())
            || !debit.is_transfer_leg()
            || !credit.is_transfer_leg()
        {
            return Err(EngineError::InvalidPayment(format!(
                "credit transfer legs do not pair up: {reference}"
            )));
        }
        Ok(Self {
            reference_number: reference,
            from_player_id: debit.player_id,
            to_player_id: credit.player_id,
            amount: credit.amount,
            payment_date: credit.payment_date,
            notes: credit.notes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(player: Uuid, amount: i64, reference: &str) -> Payment {
        let mut p = Payment::new(
            "org",
            player,
            Money::new(amount),
            PaymentMethod::CreditTransfer,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();
        p.reference_number = Some(reference.to_string());
        p
    }

    #[test]
    fn zero_payment_is_rejected() {
        let err = Payment::new(
            "org",
            Uuid::new_v4(),
            Money::ZERO,
            PaymentMethod::Cash,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("payment amount must not be zero".to_string())
        );
    }

    #[test]
    fn transfer_legs_pair_up() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let transfer =
            CreditTransfer::from_legs(&[leg(to, 500, "CT-1"), leg(from, -500, "CT-1")]).unwrap();
        assert_eq!(transfer.from_player_id, from);
        assert_eq!(transfer.to_player_id, to);
        assert_eq!(transfer.amount, Money::new(500));
    }

    #[test]
    fn mismatched_legs_are_rejected() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(CreditTransfer::from_legs(&[leg(to, 500, "CT-1"), leg(from, -400, "CT-1")]).is_err());
        assert!(CreditTransfer::from_legs(&[leg(to, 500, "CT-1")]).is_err());
        assert!(CreditTransfer::from_legs(&[leg(to, 500, "CT-1"), leg(from, 500, "CT-1")]).is_err());
    }

    #[test]
    fn method_round_trips_through_str() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Paynow,
            PaymentMethod::BankTransfer,
            PaymentMethod::CreditTransfer,
            PaymentMethod::Other,
        ] {
            assert_eq!(PaymentMethod::try_from(method.as_str()).unwrap(), method);
        }
    }
}
