//! Join rows between sessions and players, carrying the charge.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// What one player owes for one session.
///
/// `amount_owed` is `None` for the expected participants of a planned (or
/// cancelled) session; it is set, and non-negative, once the session is
/// completed. Only completed sessions count towards balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParticipant {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub amount_owed: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl SessionParticipant {
    pub fn new(session_id: Uuid, player_id: Uuid, amount_owed: Option<Money>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            player_id,
            amount_owed,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "session_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    pub amount_owed_minor: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sessions::Entity",
        from = "Column::SessionId",
        to = "super::sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Sessions,
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::PlayerId",
        to = "super::players::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Players,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Players.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SessionParticipant> for ActiveModel {
    fn from(value: &SessionParticipant) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            session_id: ActiveValue::Set(value.session_id.to_string()),
            player_id: ActiveValue::Set(value.player_id.to_string()),
            amount_owed_minor: ActiveValue::Set(value.amount_owed.map(Money::minor)),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for SessionParticipant {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "session participant")?,
            session_id: parse_uuid(&model.session_id, "session")?,
            player_id: parse_uuid(&model.player_id, "player")?,
            amount_owed: model.amount_owed_minor.map(Money::new),
            created_at: model.created_at,
        })
    }
}
