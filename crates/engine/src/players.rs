//! The module contains `Player` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::name_key, util::parse_uuid};

/// A player on one organizer's roster.
///
/// Temporary players are drop-ins created while recording a session. They are
/// charged exactly like regular players but have no login identity.
///
/// Players are never hard-deleted while sessions or payments reference them:
/// deactivation (`is_active = false`) is the removal path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub organizer_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub is_temporary: bool,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(organizer_id: &str, name: String, is_temporary: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organizer_id: organizer_id.to_string(),
            name,
            phone: None,
            is_temporary,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "players")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub organizer_id: String,
    pub name: String,
    pub name_norm: String,
    pub phone: Option<String>,
    pub is_temporary: bool,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizers::Entity",
        from = "Column::OrganizerId",
        to = "super::organizers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Organizers,
    #[sea_orm(has_many = "super::session_participants::Entity")]
    SessionParticipants,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::organizers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizers.def()
    }
}

impl Related<super::session_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionParticipants.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Player> for ActiveModel {
    fn from(value: &Player) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            organizer_id: ActiveValue::Set(value.organizer_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::Set(name_key(&value.name)),
            phone: ActiveValue::Set(value.phone.clone()),
            is_temporary: ActiveValue::Set(value.is_temporary),
            is_active: ActiveValue::Set(value.is_active),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Player {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "player")?,
            organizer_id: model.organizer_id,
            name: model.name,
            phone: model.phone,
            is_temporary: model.is_temporary,
            is_active: model.is_active,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
