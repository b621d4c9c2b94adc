//! Playing sessions.
//!
//! A session stores only its raw cost inputs. The total and the per-player
//! cost are accessors ([`Session::total_cost`], [`Session::cost_per_player`])
//! and are never persisted, so they cannot drift from their inputs.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planned,
    #[default]
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for SessionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "planned" => Ok(Self::Planned),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidSession(format!(
                "invalid session status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub organizer_id: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub court_cost: Money,
    pub shuttlecock_cost: Money,
    pub other_costs: Money,
    pub participant_count: u32,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Court + shuttlecock + other costs.
    #[must_use]
    pub fn total_cost(&self) -> Money {
        self.court_cost
            .saturating_add(self.shuttlecock_cost)
            .saturating_add(self.other_costs)
    }

    /// Even share of [`Session::total_cost`], rounded to one decimal place.
    /// Zero when nobody took part.
    #[must_use]
    pub fn cost_per_player(&self) -> Money {
        self.total_cost()
            .split_to_tenth(self.participant_count as usize)
    }

    pub(crate) fn validate_costs(&self) -> ResultEngine<()> {
        for (label, cost) in [
            ("court_cost", self.court_cost),
            ("shuttlecock_cost", self.shuttlecock_cost),
            ("other_costs", self.other_costs),
        ] {
            if cost.is_negative() {
                return Err(EngineError::InvalidAmount(format!("{label} must be >= 0")));
            }
        }
        if Money::checked_sum([self.court_cost, self.shuttlecock_cost, self.other_costs]).is_none() {
            return Err(EngineError::InvalidAmount(
                "session costs are too large".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && end < start
        {
            return Err(EngineError::InvalidSession(
                "end_time must not be before start_time".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub organizer_id: String,
    pub date: Date,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
    pub location: Option<String>,
    pub court_cost_minor: i64,
    pub shuttlecock_cost_minor: i64,
    pub other_costs_minor: i64,
    pub participant_count: i32,
    pub status: String,
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

impl ActiveModelBehavior for ActiveModel {}

impl From<&Session> for ActiveModel {
    fn from(value: &Session) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            organizer_id: ActiveValue::Set(value.organizer_id.clone()),
            date: ActiveValue::Set(value.date),
            start_time: ActiveValue::Set(value.start_time),
            end_time: ActiveValue::Set(value.end_time),
            location: ActiveValue::Set(value.location.clone()),
            court_cost_minor: ActiveValue::Set(value.court_cost.minor()),
            shuttlecock_cost_minor: ActiveValue::Set(value.shuttlecock_cost.minor()),
            other_costs_minor: ActiveValue::Set(value.other_costs.minor()),
            participant_count: ActiveValue::Set(
                i32::try_from(value.participant_count).unwrap_or(i32::MAX),
            ),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Session {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "session")?,
            organizer_id: model.organizer_id,
            date: model.date,
            start_time: model.start_time,
            end_time: model.end_time,
            location: model.location,
            court_cost: Money::new(model.court_cost_minor),
            shuttlecock_cost: Money::new(model.shuttlecock_cost_minor),
            other_costs: Money::new(model.other_costs_minor),
            participant_count: u32::try_from(model.participant_count).map_err(|_| {
                EngineError::InvalidSession("participant_count must be >= 0".to_string())
            })?,
            status: SessionStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
