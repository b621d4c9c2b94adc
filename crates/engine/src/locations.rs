//! Venues, used as a picklist for sessions.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::name_key, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub organizer_id: String,
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(organizer_id: &str, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            organizer_id: organizer_id.to_string(),
            name,
            address: None,
            notes: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub organizer_id: String,
    pub name: String,
    pub name_norm: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
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
}

impl Related<super::organizers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Location> for ActiveModel {
    fn from(value: &Location) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            organizer_id: ActiveValue::Set(value.organizer_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::Set(name_key(&value.name)),
            address: ActiveValue::Set(value.address.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Location {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "location")?,
            organizer_id: model.organizer_id,
            name: model.name,
            address: model.address,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}
