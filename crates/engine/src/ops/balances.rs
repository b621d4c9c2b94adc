use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, FinancialSummary, Money, PlayerBalance, ResultEngine, SessionStatus, payments,
    player_balances, players, session_participants, sessions,
};

use super::{Engine, with_tx};

/// Which balances to list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceFilter {
    /// Every player with a projection row, largest debt first.
    #[default]
    All,
    /// Players owing at least `min`, largest debt first.
    Debtors { min: Money },
    /// Players in credit by at least `min`, largest credit first.
    Creditors { min: Money },
}

impl BalanceFilter {
    fn accepts(&self, balance: &PlayerBalance) -> bool {
        match *self {
            Self::All => true,
            Self::Debtors { min } => {
                balance.current_balance.is_positive() && balance.current_balance >= min
            }
            Self::Creditors { min } => {
                balance.current_balance.is_negative() && balance.current_balance.abs() >= min
            }
        }
    }
}

impl Engine {
    /// Recomputes one player's balance projection from the fact tables.
    ///
    /// Always re-reads every charge and payment (never applies a delta), so
    /// concurrent recomputes converge on the latest facts. When nothing
    /// changed the stored row is left untouched, which makes the operation
    /// idempotent down to `updated_at`.
    ///
    /// Must run inside the same transaction as the mutation that triggered it.
    pub(crate) async fn recompute_in_tx(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        player_id: Uuid,
    ) -> ResultEngine<PlayerBalance> {
        let (balance, _) = self
            .recompute_tracked_in_tx(db, organizer_id, player_id)
            .await?;
        Ok(balance)
    }

    /// [`Engine::recompute_in_tx`], also telling whether the stored row was
    /// written (`false` when it already matched the facts).
    pub(crate) async fn recompute_tracked_in_tx(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        player_id: Uuid,
    ) -> ResultEngine<(PlayerBalance, bool)> {
        let player_key = player_id.to_string();

        let charges: Vec<(Option<i64>, NaiveDate)> = session_participants::Entity::find()
            .select_only()
            .column(session_participants::Column::AmountOwedMinor)
            .column(sessions::Column::Date)
            .join(
                JoinType::InnerJoin,
                session_participants::Relation::Sessions.def(),
            )
            .filter(session_participants::Column::PlayerId.eq(player_key.clone()))
            .filter(sessions::Column::OrganizerId.eq(organizer_id))
            .filter(sessions::Column::Status.eq(SessionStatus::Completed.as_str()))
            .into_tuple()
            .all(db)
            .await?;

        let paid: Vec<(i64, NaiveDate)> = payments::Entity::find()
            .select_only()
            .column(payments::Column::AmountMinor)
            .column(payments::Column::PaymentDate)
            .filter(payments::Column::PlayerId.eq(player_key.clone()))
            .filter(payments::Column::OrganizerId.eq(organizer_id))
            .into_tuple()
            .all(db)
            .await?;

        let overflow = || {
            EngineError::InvalidAmount(format!("balance of player {player_id} is out of range"))
        };
        let total_owed = Money::checked_sum(
            charges
                .iter()
                .map(|(amount, _)| Money::new(amount.unwrap_or_default())),
        )
        .ok_or_else(overflow)?;
        let total_paid = Money::checked_sum(paid.iter().map(|(amount, _)| Money::new(*amount)))
            .ok_or_else(overflow)?;

        let mut balance = PlayerBalance::zero(organizer_id, player_id);
        balance.total_owed = total_owed;
        balance.total_paid = total_paid;
        balance.current_balance = total_owed.checked_sub(total_paid).ok_or_else(overflow)?;
        balance.last_session_date = charges.iter().map(|(_, date)| *date).max();
        balance.last_payment_date = paid.iter().map(|(_, date)| *date).max();

        let existing = player_balances::Entity::find_by_id((organizer_id.to_string(), player_key))
            .one(db)
            .await?;

        match existing {
            Some(model) => {
                let stored = PlayerBalance::try_from(model)?;
                if stored.same_facts(&balance) {
                    return Ok((stored, false));
                }
                balance.updated_at = Some(Utc::now());
                let mut active = player_balances::ActiveModel::from(&balance);
                active.organizer_id = ActiveValue::Unchanged(organizer_id.to_string());
                active.player_id = ActiveValue::Unchanged(player_id.to_string());
                active.update(db).await?;
            }
            None => {
                balance.updated_at = Some(Utc::now());
                player_balances::ActiveModel::from(&balance)
                    .insert(db)
                    .await?;
            }
        }

        tracing::debug!(
            organizer_id = %organizer_id,
            %player_id,
            balance = %balance.current_balance,
            "player balance recomputed"
        );
        Ok((balance, true))
    }

    /// Recomputes every listed player once (duplicates are collapsed).
    pub(crate) async fn recompute_many_in_tx(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        player_ids: impl IntoIterator<Item = Uuid>,
    ) -> ResultEngine<()> {
        let unique: BTreeSet<Uuid> = player_ids.into_iter().collect();
        for player_id in unique {
            self.recompute_in_tx(db, organizer_id, player_id).await?;
        }
        Ok(())
    }

    /// Recomputes a player's balance projection and returns it.
    pub async fn recompute_player_balance(
        &self,
        organizer_id: &str,
        player_id: Uuid,
    ) -> ResultEngine<PlayerBalance> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            self.require_player(&db_tx, organizer_id, player_id).await?;
            self.recompute_in_tx(&db_tx, organizer_id, player_id).await
        })
    }

    /// Recomputes the projection of every player of the organizer.
    ///
    /// Returns the number of players processed.
    pub async fn recompute_all_balances(&self, organizer_id: &str) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let ids: Vec<String> = players::Entity::find()
                .select_only()
                .column(players::Column::Id)
                .filter(players::Column::OrganizerId.eq(organizer_id))
                .into_tuple()
                .all(&db_tx)
                .await?;
            let mut count = 0;
            for id in ids {
                let player_id = crate::util::parse_uuid(&id, "player")?;
                self.recompute_in_tx(&db_tx, organizer_id, player_id).await?;
                count += 1;
            }
            tracing::info!(organizer_id = %organizer_id, players = count, "balances recomputed");
            Ok(count)
        })
    }

    /// Returns a player's balance.
    ///
    /// A player with no projection row yet gets a synthetic zero balance.
    pub async fn player_balance(
        &self,
        organizer_id: &str,
        player_id: Uuid,
    ) -> ResultEngine<PlayerBalance> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            self.require_player(&db_tx, organizer_id, player_id).await?;
            let model = player_balances::Entity::find_by_id((
                organizer_id.to_string(),
                player_id.to_string(),
            ))
            .one(&db_tx)
            .await?;
            match model {
                Some(model) => PlayerBalance::try_from(model),
                None => Ok(PlayerBalance::zero(organizer_id, player_id)),
            }
        })
    }

    /// Lists balances of the organizer.
    ///
    /// `All` and `Debtors` are sorted by balance descending (largest debt
    /// first); `Creditors` by balance ascending (largest credit first).
    pub async fn balances(
        &self,
        organizer_id: &str,
        filter: BalanceFilter,
    ) -> ResultEngine<Vec<PlayerBalance>> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let mut query = player_balances::Entity::find()
                .filter(player_balances::Column::OrganizerId.eq(organizer_id));
            query = match filter {
                BalanceFilter::Creditors { .. } => {
                    query.order_by_asc(player_balances::Column::CurrentBalanceMinor)
                }
                _ => query.order_by_desc(player_balances::Column::CurrentBalanceMinor),
            };
            let models = query
                .order_by_asc(player_balances::Column::PlayerId)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let balance = PlayerBalance::try_from(model)?;
                if filter.accepts(&balance) {
                    out.push(balance);
                }
            }
            Ok(out)
        })
    }

    /// Totals over all balances of the organizer.
    pub async fn financial_summary(&self, organizer_id: &str) -> ResultEngine<FinancialSummary> {
        let balances = self.balances(organizer_id, BalanceFilter::All).await?;
        Ok(FinancialSummary::from_balances(&balances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_balance(minor: i64) -> PlayerBalance {
        let mut b = PlayerBalance::zero("org", Uuid::new_v4());
        b.current_balance = Money::new(minor);
        b
    }

    #[test]
    fn filter_respects_minimum_magnitude() {
        let debtors = BalanceFilter::Debtors { min: Money::new(500) };
        assert!(debtors.accepts(&with_balance(500)));
        assert!(!debtors.accepts(&with_balance(499)));
        assert!(!debtors.accepts(&with_balance(-900)));

        let creditors = BalanceFilter::Creditors { min: Money::new(500) };
        assert!(creditors.accepts(&with_balance(-500)));
        assert!(!creditors.accepts(&with_balance(-100)));
        assert!(!creditors.accepts(&with_balance(0)));

        assert!(BalanceFilter::All.accepts(&with_balance(0)));
    }
}
