use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Allocation, CostInputs, EngineError, Money, Player, PlanSessionCmd, RecordSessionCmd,
    ResultEngine, Session, SessionMeta, SessionParticipant, SessionStatus, UpdateSessionCmd,
    allocate, session_participants, sessions,
    util::{normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{DateRange, Engine, with_tx};

/// A session with its participant rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: Session,
    pub participants: Vec<SessionParticipant>,
}

/// Outcome of recording or re-allocating a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecorded {
    pub session_id: Uuid,
    pub allocation: Allocation,
    /// Temporary players created for drop-ins during this call.
    pub drop_in_player_ids: Vec<Uuid>,
}

fn normalize_meta(meta: SessionMeta) -> SessionMeta {
    SessionMeta {
        start_time: meta.start_time,
        end_time: meta.end_time,
        location: normalize_optional_text(meta.location.as_deref()),
        notes: normalize_optional_text(meta.notes.as_deref()),
    }
}

impl Engine {
    /// Checks the listed players and creates temporary players for drop-ins.
    ///
    /// Returns `(participants, created_drop_ins)`. A drop-in whose name
    /// matches an existing player reuses that player.
    async fn resolve_participants(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        player_ids: &[Uuid],
        drop_in_names: &[String],
    ) -> ResultEngine<(Vec<Uuid>, Vec<Uuid>)> {
        let mut seen = HashSet::new();
        let mut participants = Vec::with_capacity(player_ids.len() + drop_in_names.len());
        for &player_id in player_ids {
            if !seen.insert(player_id) {
                return Err(EngineError::InvalidSession(format!(
                    "player {player_id} listed twice"
                )));
            }
            let model = self.require_player(db, organizer_id, player_id).await?;
            if !model.is_active {
                return Err(EngineError::InvalidSession(format!(
                    "player {} is inactive",
                    model.name
                )));
            }
            participants.push(player_id);
        }

        let mut created = Vec::new();
        for raw_name in drop_in_names {
            let name = normalize_required_name(raw_name, "player")?;
            let player_id = match self.find_player_by_name(db, organizer_id, &name).await? {
                Some(existing) => {
                    if !existing.is_active {
                        return Err(EngineError::InvalidSession(format!(
                            "player {} is inactive",
                            existing.name
                        )));
                    }
                    parse_uuid(&existing.id, "player")?
                }
                None => {
                    let player = Player::new(organizer_id, name, true);
                    self.insert_player(db, &player).await?;
                    tracing::info!(organizer_id = %organizer_id, player_id = %player.id, "drop-in player created");
                    created.push(player.id);
                    player.id
                }
            };
            if seen.insert(player_id) {
                participants.push(player_id);
            }
        }

        Ok((participants, created))
    }

    async fn insert_participants(
        &self,
        db: &DatabaseTransaction,
        session_id: Uuid,
        player_ids: &[Uuid],
        amount_owed: Option<Money>,
    ) -> ResultEngine<()> {
        for &player_id in player_ids {
            let participant = SessionParticipant::new(session_id, player_id, amount_owed);
            session_participants::ActiveModel::from(&participant)
                .insert(db)
                .await?;
        }
        Ok(())
    }

    pub(crate) async fn participant_ids(
        &self,
        db: &DatabaseTransaction,
        session_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        let ids: Vec<String> = session_participants::Entity::find()
            .select_only()
            .column(session_participants::Column::PlayerId)
            .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
            .into_tuple()
            .all(db)
            .await?;
        ids.iter().map(|id| parse_uuid(id, "player")).collect()
    }

    /// Records a completed session and bills each participant an even share.
    ///
    /// Drop-ins are created as temporary players and billed like everyone
    /// else. With no participants the session is stored and nobody is billed.
    pub async fn record_session(&self, cmd: RecordSessionCmd) -> ResultEngine<SessionRecorded> {
        let RecordSessionCmd {
            organizer_id,
            date,
            costs,
            participant_ids,
            drop_in_names,
            meta,
        } = cmd;
        let meta = normalize_meta(meta);
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, &organizer_id).await?;
            let (participants, drop_ins) = self
                .resolve_participants(&db_tx, &organizer_id, &participant_ids, &drop_in_names)
                .await?;
            let allocation = allocate(&costs, participants.len())?;

            let now = Utc::now();
            let session = Session {
                id: Uuid::new_v4(),
                organizer_id: organizer_id.clone(),
                date,
                start_time: meta.start_time,
                end_time: meta.end_time,
                location: meta.location.clone(),
                court_cost: allocation.court_cost,
                shuttlecock_cost: allocation.shuttlecock_cost,
                other_costs: allocation.other_costs,
                participant_count: participants.len() as u32,
                status: SessionStatus::Completed,
                notes: meta.notes.clone(),
                created_at: now,
                updated_at: now,
            };
            session.validate_costs()?;
            sessions::ActiveModel::from(&session).insert(&db_tx).await?;

            self.insert_participants(
                &db_tx,
                session.id,
                &participants,
                Some(allocation.cost_per_player),
            )
            .await?;
            self.recompute_many_in_tx(&db_tx, &organizer_id, participants.iter().copied())
                .await?;

            tracing::info!(
                organizer_id = %organizer_id,
                session_id = %session.id,
                total = %allocation.total,
                per_player = %allocation.cost_per_player,
                participants = participants.len(),
                "session recorded"
            );
            Ok(SessionRecorded {
                session_id: session.id,
                allocation,
                drop_in_player_ids: drop_ins,
            })
        })
    }

    /// Creates a planned session with its expected players. Nobody is billed
    /// until [`Engine::complete_session`].
    pub async fn plan_session(&self, cmd: PlanSessionCmd) -> ResultEngine<Uuid> {
        let PlanSessionCmd {
            organizer_id,
            date,
            expected_player_ids,
            meta,
        } = cmd;
        let meta = normalize_meta(meta);
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, &organizer_id).await?;
            let (expected, _) = self
                .resolve_participants(&db_tx, &organizer_id, &expected_player_ids, &[])
                .await?;

            let now = Utc::now();
            let session = Session {
                id: Uuid::new_v4(),
                organizer_id: organizer_id.clone(),
                date,
                start_time: meta.start_time,
                end_time: meta.end_time,
                location: meta.location,
                court_cost: Money::ZERO,
                shuttlecock_cost: Money::ZERO,
                other_costs: Money::ZERO,
                participant_count: expected.len() as u32,
                status: SessionStatus::Planned,
                notes: meta.notes,
                created_at: now,
                updated_at: now,
            };
            session.validate_costs()?;
            sessions::ActiveModel::from(&session).insert(&db_tx).await?;
            self.insert_participants(&db_tx, session.id, &expected, None)
                .await?;
            self.recompute_many_in_tx(&db_tx, &organizer_id, expected.iter().copied())
                .await?;
            Ok(session.id)
        })
    }

    /// Completes a planned session: allocates the costs over its expected
    /// players and bills them.
    pub async fn complete_session(
        &self,
        organizer_id: &str,
        session_id: Uuid,
        costs: CostInputs,
    ) -> ResultEngine<Allocation> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_session(&db_tx, organizer_id, session_id)
                .await?;
            let session = Session::try_from(model)?;
            if session.status != SessionStatus::Planned {
                return Err(EngineError::InvalidSession(format!(
                    "session is {}, only planned sessions can be completed",
                    session.status.as_str()
                )));
            }

            let participants = self.participant_ids(&db_tx, session_id).await?;
            let allocation = allocate(&costs, participants.len())?;

            let active = sessions::ActiveModel {
                id: ActiveValue::Unchanged(session_id.to_string()),
                court_cost_minor: ActiveValue::Set(allocation.court_cost.minor()),
                shuttlecock_cost_minor: ActiveValue::Set(allocation.shuttlecock_cost.minor()),
                other_costs_minor: ActiveValue::Set(allocation.other_costs.minor()),
                participant_count: ActiveValue::Set(participants.len() as i32),
                status: ActiveValue::Set(SessionStatus::Completed.as_str().to_string()),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            session_participants::Entity::update_many()
                .col_expr(
                    session_participants::Column::AmountOwedMinor,
                    Expr::value(Some(allocation.cost_per_player.minor())),
                )
                .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                .exec(&db_tx)
                .await?;
            self.recompute_many_in_tx(&db_tx, organizer_id, participants)
                .await?;
            Ok(allocation)
        })
    }

    /// Replaces the costs and the participant list of a completed session.
    ///
    /// All previous participant rows are deleted and a fresh set is inserted;
    /// balances are recomputed for everyone in the old or the new list, so a
    /// removed player loses their share.
    pub async fn update_session(&self, cmd: UpdateSessionCmd) -> ResultEngine<SessionRecorded> {
        let UpdateSessionCmd {
            organizer_id,
            session_id,
            costs,
            participant_ids,
            drop_in_names,
            date,
            meta,
        } = cmd;
        let meta = normalize_meta(meta);
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, &organizer_id).await?;
            let model = self
                .require_session(&db_tx, &organizer_id, session_id)
                .await?;
            let session = Session::try_from(model)?;
            if session.status != SessionStatus::Completed {
                return Err(EngineError::InvalidSession(format!(
                    "session is {}, only completed sessions can be edited",
                    session.status.as_str()
                )));
            }

            let previous = self.participant_ids(&db_tx, session_id).await?;
            session_participants::Entity::delete_many()
                .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                .exec(&db_tx)
                .await?;

            let (participants, drop_ins) = self
                .resolve_participants(&db_tx, &organizer_id, &participant_ids, &drop_in_names)
                .await?;
            let allocation = allocate(&costs, participants.len())?;

            let mut active = sessions::ActiveModel {
                id: ActiveValue::Unchanged(session_id.to_string()),
                court_cost_minor: ActiveValue::Set(allocation.court_cost.minor()),
                shuttlecock_cost_minor: ActiveValue::Set(allocation.shuttlecock_cost.minor()),
                other_costs_minor: ActiveValue::Set(allocation.other_costs.minor()),
                participant_count: ActiveValue::Set(participants.len() as i32),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            if let Some(date) = date {
                active.date = ActiveValue::Set(date);
            }
            if meta.start_time.is_some() {
                active.start_time = ActiveValue::Set(meta.start_time);
            }
            if meta.end_time.is_some() {
                active.end_time = ActiveValue::Set(meta.end_time);
            }
            if meta.location.is_some() {
                active.location = ActiveValue::Set(meta.location);
            }
            if meta.notes.is_some() {
                active.notes = ActiveValue::Set(meta.notes);
            }
            active.update(&db_tx).await?;

            self.insert_participants(
                &db_tx,
                session_id,
                &participants,
                Some(allocation.cost_per_player),
            )
            .await?;
            self.recompute_many_in_tx(
                &db_tx,
                &organizer_id,
                previous.iter().chain(participants.iter()).copied(),
            )
            .await?;

            tracing::info!(
                organizer_id = %organizer_id,
                %session_id,
                removed = previous.iter().filter(|id| !participants.contains(id)).count(),
                participants = participants.len(),
                "session updated"
            );
            Ok(SessionRecorded {
                session_id,
                allocation,
                drop_in_player_ids: drop_ins,
            })
        })
    }

    /// Cancels a session. Participant rows are kept with no charge.
    pub async fn cancel_session(&self, organizer_id: &str, session_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_session(&db_tx, organizer_id, session_id)
                .await?;
            if model.status == SessionStatus::Cancelled.as_str() {
                return Ok(());
            }

            let active = sessions::ActiveModel {
                id: ActiveValue::Unchanged(session_id.to_string()),
                status: ActiveValue::Set(SessionStatus::Cancelled.as_str().to_string()),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            session_participants::Entity::update_many()
                .col_expr(
                    session_participants::Column::AmountOwedMinor,
                    Expr::value(Option::<i64>::None),
                )
                .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                .exec(&db_tx)
                .await?;
            let participants = self.participant_ids(&db_tx, session_id).await?;
            self.recompute_many_in_tx(&db_tx, organizer_id, participants)
                .await?;
            Ok(())
        })
    }

    /// Deletes a session and its participant rows.
    pub async fn delete_session(&self, organizer_id: &str, session_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            self.require_session(&db_tx, organizer_id, session_id)
                .await?;
            let participants = self.participant_ids(&db_tx, session_id).await?;
            session_participants::Entity::delete_many()
                .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                .exec(&db_tx)
                .await?;
            sessions::Entity::delete_by_id(session_id.to_string())
                .exec(&db_tx)
                .await?;
            self.recompute_many_in_tx(&db_tx, organizer_id, participants)
                .await?;
            Ok(())
        })
    }

    /// Returns a session with its participants.
    pub async fn session(&self, organizer_id: &str, session_id: Uuid) -> ResultEngine<SessionDetail> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_session(&db_tx, organizer_id, session_id)
                .await?;
            let participants = session_participants::Entity::find()
                .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                .order_by_asc(session_participants::Column::CreatedAt)
                .order_by_asc(session_participants::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(SessionParticipant::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(SessionDetail {
                session: Session::try_from(model)?,
                participants,
            })
        })
    }

    /// Lists sessions in the range, most recent first.
    pub async fn sessions(&self, organizer_id: &str, range: DateRange) -> ResultEngine<Vec<Session>> {
        range.validate()?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let mut query =
                sessions::Entity::find().filter(sessions::Column::OrganizerId.eq(organizer_id));
            if let Some(from) = range.from {
                query = query.filter(sessions::Column::Date.gte(from));
            }
            if let Some(to) = range.to {
                query = query.filter(sessions::Column::Date.lte(to));
            }
            let models = query
                .order_by_desc(sessions::Column::Date)
                .order_by_desc(sessions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Session::try_from).collect()
        })
    }
}
