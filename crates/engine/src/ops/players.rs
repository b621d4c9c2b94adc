use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Player, ResultEngine, payments, player_balances, players, session_participants,
    util::{name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

/// Changes to a player. `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub is_temporary: Option<bool>,
}

impl Engine {
    /// Finds a player of the organizer by name (case/accent insensitive).
    pub(crate) async fn find_player_by_name(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        name: &str,
    ) -> ResultEngine<Option<players::Model>> {
        players::Entity::find()
            .filter(players::Column::OrganizerId.eq(organizer_id))
            .filter(players::Column::NameNorm.eq(name_key(name)))
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(crate) async fn insert_player(
        &self,
        db: &DatabaseTransaction,
        player: &Player,
    ) -> ResultEngine<()> {
        if self
            .find_player_by_name(db, &player.organizer_id, &player.name)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(player.name.clone()));
        }
        players::ActiveModel::from(player).insert(db).await?;
        Ok(())
    }

    /// Adds a regular player to the roster.
    pub async fn new_player(
        &self,
        organizer_id: &str,
        name: &str,
        phone: Option<&str>,
        notes: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "player")?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let mut player = Player::new(organizer_id, name, false);
            player.phone = normalize_optional_text(phone);
            player.notes = normalize_optional_text(notes);
            self.insert_player(&db_tx, &player).await?;
            Ok(player.id)
        })
    }

    /// Returns a player.
    pub async fn player(&self, organizer_id: &str, player_id: Uuid) -> ResultEngine<Player> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self.require_player(&db_tx, organizer_id, player_id).await?;
            Player::try_from(model)
        })
    }

    /// Lists players by name. Inactive players are included on request.
    pub async fn players(
        &self,
        organizer_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Player>> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let mut query =
                players::Entity::find().filter(players::Column::OrganizerId.eq(organizer_id));
            if !include_inactive {
                query = query.filter(players::Column::IsActive.eq(true));
            }
            let models = query
                .order_by_asc(players::Column::NameNorm)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Player::try_from).collect()
        })
    }

    /// Updates name, phone, notes or the temporary flag.
    ///
    /// Promoting a drop-in to a regular player is `is_temporary: Some(false)`.
    pub async fn update_player(
        &self,
        organizer_id: &str,
        player_id: Uuid,
        update: PlayerUpdate,
    ) -> ResultEngine<Player> {
        let name = update
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "player"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self.require_player(&db_tx, organizer_id, player_id).await?;

            if let Some(name) = name.as_deref()
                && let Some(other) = self.find_player_by_name(&db_tx, organizer_id, name).await?
                && other.id != model.id
            {
                return Err(EngineError::ExistingKey(name.to_string()));
            }

            let mut active: players::ActiveModel = model.into();
            if let Some(name) = name {
                active.name_norm = ActiveValue::Set(name_key(&name));
                active.name = ActiveValue::Set(name);
            }
            if let Some(phone) = update.phone.as_deref() {
                active.phone = ActiveValue::Set(normalize_optional_text(Some(phone)));
            }
            if let Some(notes) = update.notes.as_deref() {
                active.notes = ActiveValue::Set(normalize_optional_text(Some(notes)));
            }
            if let Some(is_temporary) = update.is_temporary {
                active.is_temporary = ActiveValue::Set(is_temporary);
            }
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;
            Player::try_from(model)
        })
    }

    /// Soft-deletes (or restores) a player.
    pub async fn set_player_active(
        &self,
        organizer_id: &str,
        player_id: Uuid,
        active: bool,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            self.require_player(&db_tx, organizer_id, player_id).await?;
            let model = players::ActiveModel {
                id: ActiveValue::Unchanged(player_id.to_string()),
                is_active: ActiveValue::Set(active),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Hard-deletes a player that never played nor paid.
    ///
    /// Players with history can only be deactivated.
    pub async fn delete_player(&self, organizer_id: &str, player_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self.require_player(&db_tx, organizer_id, player_id).await?;

            let sessions = session_participants::Entity::find()
                .filter(session_participants::Column::PlayerId.eq(model.id.clone()))
                .count(&db_tx)
                .await?;
            let paid = payments::Entity::find()
                .filter(payments::Column::PlayerId.eq(model.id.clone()))
                .count(&db_tx)
                .await?;
            if sessions > 0 || paid > 0 {
                return Err(EngineError::PlayerHasHistory(model.name));
            }

            player_balances::Entity::delete_many()
                .filter(player_balances::Column::PlayerId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            players::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
