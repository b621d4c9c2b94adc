use std::collections::BTreeMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CreditTransfer, CreditTransferCmd, CreditTransferUpdate, EngineError, Payment, PaymentCmd,
    PaymentMethod, PaymentUpdate, ResultEngine, payments,
    util::normalize_optional_text,
};

use super::{DateRange, Engine, with_tx};

const TRANSFER_PREFIX: &str = "CT-";

fn transfer_reference() -> String {
    format!("{TRANSFER_PREFIX}{}", Uuid::new_v4())
}

impl Engine {
    async fn transfer_legs(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        reference: &str,
    ) -> ResultEngine<Vec<Payment>> {
        let legs = payments::Entity::find()
            .filter(payments::Column::OrganizerId.eq(organizer_id))
            .filter(payments::Column::Method.eq(PaymentMethod::CreditTransfer.as_str()))
            .filter(payments::Column::ReferenceNumber.eq(reference))
            .order_by_asc(payments::Column::AmountMinor)
            .all(db)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        if legs.is_empty() {
            return Err(EngineError::KeyNotFound(
                "credit transfer not exists".to_string(),
            ));
        }
        Ok(legs)
    }

    /// Records money handed over by a player. Negative amounts are refunds.
    pub async fn record_payment(&self, cmd: PaymentCmd) -> ResultEngine<Uuid> {
        if cmd.method == PaymentMethod::CreditTransfer {
            return Err(EngineError::InvalidPayment(
                "credit transfers are recorded with transfer_credit".to_string(),
            ));
        }
        let mut payment = Payment::new(
            &cmd.organizer_id,
            cmd.player_id,
            cmd.amount,
            cmd.method,
            cmd.payment_date,
        )?;
        payment.reference_number = normalize_optional_text(cmd.reference_number.as_deref());
        payment.notes = normalize_optional_text(cmd.notes.as_deref());

        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, &cmd.organizer_id).await?;
            self.require_player(&db_tx, &cmd.organizer_id, cmd.player_id)
                .await?;
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;
            self.recompute_in_tx(&db_tx, &cmd.organizer_id, cmd.player_id)
                .await?;
            tracing::info!(
                organizer_id = %cmd.organizer_id,
                player_id = %cmd.player_id,
                amount = %payment.amount,
                method = payment.method.as_str(),
                "payment recorded"
            );
            Ok(payment.id)
        })
    }

    /// Returns a payment.
    pub async fn payment(&self, organizer_id: &str, payment_id: Uuid) -> ResultEngine<Payment> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_payment(&db_tx, organizer_id, payment_id)
                .await?;
            Payment::try_from(model)
        })
    }

    /// Edits a payment that is not a credit transfer leg.
    pub async fn update_payment(
        &self,
        organizer_id: &str,
        payment_id: Uuid,
        update: PaymentUpdate,
    ) -> ResultEngine<Payment> {
        if update.method == Some(PaymentMethod::CreditTransfer) {
            return Err(EngineError::InvalidPayment(
                "a payment cannot become a credit transfer".to_string(),
            ));
        }
        if update.amount.is_some_and(|a| a.is_zero()) {
            return Err(EngineError::InvalidAmount(
                "payment amount must not be zero".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_payment(&db_tx, organizer_id, payment_id)
                .await?;
            let current = Payment::try_from(model.clone())?;
            if current.is_transfer_leg() {
                return Err(EngineError::InvalidPayment(
                    "credit transfer legs are edited through the transfer".to_string(),
                ));
            }

            let mut active: payments::ActiveModel = model.into();
            if let Some(amount) = update.amount {
                active.amount_minor = ActiveValue::Set(amount.minor());
            }
            if let Some(method) = update.method {
                active.method = ActiveValue::Set(method.as_str().to_string());
            }
            if let Some(date) = update.payment_date {
                active.payment_date = ActiveValue::Set(date);
            }
            if let Some(reference) = update.reference_number.as_deref() {
                active.reference_number = ActiveValue::Set(normalize_optional_text(Some(reference)));
            }
            if let Some(notes) = update.notes.as_deref() {
                active.notes = ActiveValue::Set(normalize_optional_text(Some(notes)));
            }
            let model = active.update(&db_tx).await?;
            self.recompute_in_tx(&db_tx, organizer_id, current.player_id)
                .await?;
            Payment::try_from(model)
        })
    }

    /// Deletes a payment that is not a credit transfer leg.
    pub async fn delete_payment(&self, organizer_id: &str, payment_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_payment(&db_tx, organizer_id, payment_id)
                .await?;
            let payment = Payment::try_from(model)?;
            if payment.is_transfer_leg() {
                return Err(EngineError::InvalidPayment(
                    "credit transfer legs are deleted through the transfer".to_string(),
                ));
            }
            payments::Entity::delete_by_id(payment.id.to_string())
                .exec(&db_tx)
                .await?;
            self.recompute_in_tx(&db_tx, organizer_id, payment.player_id)
                .await?;
            Ok(())
        })
    }

    /// Lists payments, most recent first, optionally for one player.
    pub async fn payments(
        &self,
        organizer_id: &str,
        player_id: Option<Uuid>,
        range: DateRange,
    ) -> ResultEngine<Vec<Payment>> {
        range.validate()?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let mut query =
                payments::Entity::find().filter(payments::Column::OrganizerId.eq(organizer_id));
            if let Some(player_id) = player_id {
                self.require_player(&db_tx, organizer_id, player_id).await?;
                query = query.filter(payments::Column::PlayerId.eq(player_id.to_string()));
            }
            if let Some(from) = range.from {
                query = query.filter(payments::Column::PaymentDate.gte(from));
            }
            if let Some(to) = range.to {
                query = query.filter(payments::Column::PaymentDate.lte(to));
            }
            query
                .order_by_desc(payments::Column::PaymentDate)
                .order_by_desc(payments::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect()
        })
    }

    /// Moves credit from one player to another.
    ///
    /// Writes two `credit_transfer` legs under a fresh reference: the giver
    /// gets `-amount` (their balance rises), the receiver `+amount`.
    pub async fn transfer_credit(&self, cmd: CreditTransferCmd) -> ResultEngine<CreditTransfer> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }
        if cmd.from_player_id == cmd.to_player_id {
            return Err(EngineError::InvalidPayment(
                "cannot transfer credit to the same player".to_string(),
            ));
        }
        let reference = transfer_reference();
        let notes = normalize_optional_text(cmd.notes.as_deref());
        let mut legs = Vec::with_capacity(2);
        for (player_id, amount) in [
            (cmd.from_player_id, -cmd.amount),
            (cmd.to_player_id, cmd.amount),
        ] {
            let mut leg = Payment::new(
                &cmd.organizer_id,
                player_id,
                amount,
                PaymentMethod::CreditTransfer,
                cmd.payment_date,
            )?;
            leg.reference_number = Some(reference.clone());
            leg.notes = notes.clone();
            legs.push(leg);
        }

        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, &cmd.organizer_id).await?;
            self.require_player(&db_tx, &cmd.organizer_id, cmd.from_player_id)
                .await?;
            self.require_player(&db_tx, &cmd.organizer_id, cmd.to_player_id)
                .await?;
            for leg in &legs {
                payments::ActiveModel::from(leg).insert(&db_tx).await?;
            }
            self.recompute_many_in_tx(
                &db_tx,
                &cmd.organizer_id,
                [cmd.from_player_id, cmd.to_player_id],
            )
            .await?;
            tracing::info!(
                organizer_id = %cmd.organizer_id,
                %reference,
                amount = %cmd.amount,
                "credit transferred"
            );
            CreditTransfer::from_legs(&legs)
        })
    }

    /// Returns a credit transfer by reference.
    pub async fn credit_transfer(
        &self,
        organizer_id: &str,
        reference: &str,
    ) -> ResultEngine<CreditTransfer> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let legs = self.transfer_legs(&db_tx, organizer_id, reference).await?;
            CreditTransfer::from_legs(&legs)
        })
    }

    /// Edits both legs of a credit transfer together.
    pub async fn update_credit_transfer(
        &self,
        organizer_id: &str,
        reference: &str,
        update: CreditTransferUpdate,
    ) -> ResultEngine<CreditTransfer> {
        if update.amount.is_some_and(|a| !a.is_positive()) {
            return Err(EngineError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }
        let notes = update
            .notes
            .as_deref()
            .map(|n| normalize_optional_text(Some(n)));
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let legs = self.transfer_legs(&db_tx, organizer_id, reference).await?;
            let transfer = CreditTransfer::from_legs(&legs)?;
            let amount = update.amount.unwrap_or(transfer.amount);

            let mut updated = Vec::with_capacity(legs.len());
            for leg in legs {
                let signed = if leg.player_id == transfer.from_player_id {
                    -amount
                } else {
                    amount
                };
                let mut active = payments::ActiveModel {
                    id: ActiveValue::Unchanged(leg.id.to_string()),
                    amount_minor: ActiveValue::Set(signed.minor()),
                    ..Default::default()
                };
                if let Some(date) = update.payment_date {
                    active.payment_date = ActiveValue::Set(date);
                }
                if let Some(notes) = notes.clone() {
                    active.notes = ActiveValue::Set(notes);
                }
                updated.push(Payment::try_from(active.update(&db_tx).await?)?);
            }

            self.recompute_many_in_tx(
                &db_tx,
                organizer_id,
                [transfer.from_player_id, transfer.to_player_id],
            )
            .await?;
            CreditTransfer::from_legs(&updated)
        })
    }

    /// Deletes both legs of a credit transfer.
    pub async fn delete_credit_transfer(
        &self,
        organizer_id: &str,
        reference: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let legs = self.transfer_legs(&db_tx, organizer_id, reference).await?;
            payments::Entity::delete_many()
                .filter(
                    payments::Column::Id.is_in(legs.iter().map(|leg| leg.id.to_string())),
                )
                .exec(&db_tx)
                .await?;
            self.recompute_many_in_tx(&db_tx, organizer_id, legs.iter().map(|leg| leg.player_id))
                .await?;
            tracing::info!(organizer_id = %organizer_id, reference, "credit transfer deleted");
            Ok(())
        })
    }

    /// Lists references of transfers whose legs do not form exactly one
    /// `-amount`/`+amount` pair. Legs without a reference are listed as `""`.
    pub async fn verify_credit_transfers(&self, organizer_id: &str) -> ResultEngine<Vec<String>> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let legs = payments::Entity::find()
                .filter(payments::Column::OrganizerId.eq(organizer_id))
                .filter(payments::Column::Method.eq(PaymentMethod::CreditTransfer.as_str()))
                .all(&db_tx)
                .await?;

            let mut by_reference: BTreeMap<String, Vec<Payment>> = BTreeMap::new();
            for model in legs {
                let leg = Payment::try_from(model)?;
                by_reference
                    .entry(leg.reference_number.clone().unwrap_or_default())
                    .or_default()
                    .push(leg);
            }

            let broken: Vec<String> = by_reference
                .into_iter()
                .filter(|(reference, legs)| {
                    reference.is_empty() || CreditTransfer::from_legs(legs).is_err()
                })
                .map(|(reference, _)| reference)
                .collect();
            if !broken.is_empty() {
                tracing::warn!(organizer_id = %organizer_id, count = broken.len(), "unpaired credit transfers");
            }
            Ok(broken)
        })
    }
}

