use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder,
    SqlErr, TransactionTrait, prelude::*, sea_query::Query,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    CreditTransfer, EngineError, Location, Payment, PaymentMethod, Player, ResultEngine, Session,
    SessionParticipant, locations,
    ops::{Engine, with_tx},
    payments, player_balances, players, session_participants, sessions,
    util::{name_key, normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{
    Archive, BalanceRecord, ConflictMode, EntityCounts, ImportCounts, ImportOptions, ImportResult,
    LocationRecord, ParticipantRecord, PaymentRecord, PlayerRecord, SessionRecord,
    validate::parse_validated,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Locations,
    Players,
    Sessions,
    Participants,
    Payments,
    Balances,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Players => "players",
            Self::Sessions => "sessions",
            Self::Participants => "session_participants",
            Self::Payments => "payments",
            Self::Balances => "player_balances",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Created,
    Updated,
    Skipped,
}

impl EntityCounts {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

impl ImportCounts {
    fn stage_mut(&mut self, stage: Stage) -> &mut EntityCounts {
        match stage {
            Stage::Locations => &mut self.locations,
            Stage::Players => &mut self.players,
            Stage::Sessions => &mut self.sessions,
            Stage::Participants => &mut self.session_participants,
            Stage::Payments => &mut self.payments,
            Stage::Balances => &mut self.player_balances,
        }
    }

    /// Sum over every entity type.
    pub fn total(&self) -> EntityCounts {
        [
            self.locations,
            self.players,
            self.sessions,
            self.session_participants,
            self.payments,
            self.player_balances,
        ]
        .into_iter()
        .fold(EntityCounts::default(), |acc, c| EntityCounts {
            created: acc.created + c.created,
            updated: acc.updated + c.updated,
            skipped: acc.skipped + c.skipped,
            errors: acc.errors + c.errors,
        })
    }
}

/// Value for an empty slot in merge mode. `None` keeps the existing value.
fn merged<T: Clone>(existing: &Option<T>, incoming: &Option<T>) -> Option<Option<T>> {
    match (existing, incoming) {
        (None, Some(value)) => Some(Some(value.clone())),
        _ => None,
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Deletes every row of the organizer, children first.
pub(crate) async fn clear_organizer_rows<C: ConnectionTrait>(
    db: &C,
    organizer_id: &str,
) -> ResultEngine<u64> {
    let mut removed = 0;
    removed += player_balances::Entity::delete_many()
        .filter(player_balances::Column::OrganizerId.eq(organizer_id))
        .exec(db)
        .await?
        .rows_affected;
    removed += payments::Entity::delete_many()
        .filter(payments::Column::OrganizerId.eq(organizer_id))
        .exec(db)
        .await?
        .rows_affected;
    removed += session_participants::Entity::delete_many()
        .filter(
            session_participants::Column::SessionId.in_subquery(
                Query::select()
                    .column(sessions::Column::Id)
                    .from(sessions::Entity)
                    .and_where(sessions::Column::OrganizerId.eq(organizer_id))
                    .to_owned(),
            ),
        )
        .exec(db)
        .await?
        .rows_affected;
    removed += sessions::Entity::delete_many()
        .filter(sessions::Column::OrganizerId.eq(organizer_id))
        .exec(db)
        .await?
        .rows_affected;
    removed += players::Entity::delete_many()
        .filter(players::Column::OrganizerId.eq(organizer_id))
        .exec(db)
        .await?
        .rows_affected;
    removed += locations::Entity::delete_many()
        .filter(locations::Column::OrganizerId.eq(organizer_id))
        .exec(db)
        .await?
        .rows_affected;
    Ok(removed)
}

/// One import run. Holds the id mappings from archive ids to stored ids.
struct Importer<'a, C> {
    engine: &'a Engine,
    conn: &'a C,
    organizer_id: &'a str,
    options: &'a ImportOptions,
    location_ids: HashMap<String, Uuid>,
    player_ids: HashMap<String, Uuid>,
    session_ids: HashMap<String, Uuid>,
    /// Stored sessions already matched or created by this run.
    claimed_sessions: HashSet<Uuid>,
    /// Stored payments already matched or created by this run.
    claimed_payments: HashSet<String>,
    transfer_references: BTreeSet<String>,
    report: ImportResult,
}

impl<'a, C> Importer<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    fn new(engine: &'a Engine, conn: &'a C, organizer_id: &'a str, options: &'a ImportOptions) -> Self {
        Self {
            engine,
            conn,
            organizer_id,
            options,
            location_ids: HashMap::new(),
            player_ids: HashMap::new(),
            session_ids: HashMap::new(),
            claimed_sessions: HashSet::new(),
            claimed_payments: HashSet::new(),
            transfer_references: BTreeSet::new(),
            report: ImportResult::default(),
        }
    }

    fn checkpoint(&self, next: &str) -> ResultEngine<()> {
        if self
            .options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.is_cancelled())
        {
            return Err(EngineError::Cancelled(format!("import stopped before {next}")));
        }
        Ok(())
    }

    fn skip(&mut self, stage: Stage, record_id: &str, reason: String) -> Outcome {
        tracing::warn!(stage = stage.name(), %record_id, %reason, "import record skipped");
        self.report
            .warnings
            .push(format!("{}[{record_id}]: skipped, {reason}", stage.name()));
        Outcome::Skipped
    }

    fn tally(&mut self, stage: Stage, record_id: &str, result: ResultEngine<Outcome>) {
        match result {
            Ok(outcome) => self.report.counts.stage_mut(stage).add(outcome),
            Err(err) => {
                tracing::warn!(stage = stage.name(), %record_id, %err, "import record failed");
                self.report.counts.stage_mut(stage).errors += 1;
                self.report
                    .errors
                    .push(format!("{}[{record_id}]: {err}", stage.name()));
            }
        }
    }

    fn stage_done(&self, stage: Stage) {
        let counts = match stage {
            Stage::Locations => self.report.counts.locations,
            Stage::Players => self.report.counts.players,
            Stage::Sessions => self.report.counts.sessions,
            Stage::Participants => self.report.counts.session_participants,
            Stage::Payments => self.report.counts.payments,
            Stage::Balances => self.report.counts.player_balances,
        };
        let mapped = match stage {
            Stage::Locations => self.location_ids.len(),
            Stage::Players => self.player_ids.len(),
            Stage::Sessions => self.session_ids.len(),
            _ => 0,
        };
        tracing::info!(
            organizer_id = %self.organizer_id,
            stage = stage.name(),
            created = counts.created,
            updated = counts.updated,
            skipped = counts.skipped,
            errors = counts.errors,
            mapped,
            "import stage finished"
        );
    }

    async fn run(mut self, archive: &Archive) -> ImportResult {
        let outcome = self.stages(archive).await;
        let total = self.report.counts.total();
        match outcome {
            Ok(()) => {
                self.report.success = total.errors == 0;
                self.report.message = format!(
                    "import finished: {} created, {} updated, {} skipped, {} errors",
                    total.created, total.updated, total.skipped, total.errors
                );
            }
            Err(err) => {
                tracing::warn!(organizer_id = %self.organizer_id, %err, "import aborted");
                self.report.success = false;
                self.report.message = format!(
                    "import aborted after {} created, {} updated, {} skipped",
                    total.created, total.updated, total.skipped
                );
                self.report.errors.push(err.to_string());
            }
        }
        self.report
    }

    async fn stages(&mut self, archive: &Archive) -> ResultEngine<()> {
        if archive.metadata.organizer_id != self.organizer_id {
            tracing::info!(
                from = %archive.metadata.organizer_id,
                to = %self.organizer_id,
                "importing archive of another organizer"
            );
        }

        if self.options.clear_existing_data {
            self.checkpoint("clearing existing data")?;
            let tx = self.conn.begin().await?;
            let removed = clear_organizer_rows(&tx, self.organizer_id).await?;
            tx.commit().await?;
            tracing::warn!(organizer_id = %self.organizer_id, removed, "existing data cleared");
            self.report
                .warnings
                .push(format!("cleared {removed} existing rows before import"));
        }

        self.checkpoint(Stage::Locations.name())?;
        for record in &archive.data.locations {
            let result = self.import_location(record).await;
            self.tally(Stage::Locations, &record.id, result);
        }
        self.stage_done(Stage::Locations);

        self.checkpoint(Stage::Players.name())?;
        for record in &archive.data.players {
            let result = self.import_player(record).await;
            self.tally(Stage::Players, &record.id, result);
        }
        self.stage_done(Stage::Players);

        self.checkpoint(Stage::Sessions.name())?;
        for record in &archive.data.sessions {
            let result = self.import_session(record).await;
            self.tally(Stage::Sessions, &record.id, result);
        }
        self.stage_done(Stage::Sessions);

        self.checkpoint(Stage::Participants.name())?;
        for record in &archive.data.session_participants {
            let result = self.import_participant(record).await;
            self.tally(Stage::Participants, &record.id, result);
        }
        self.stage_done(Stage::Participants);

        self.checkpoint(Stage::Payments.name())?;
        for record in &archive.data.payments {
            let result = self.import_payment(record).await;
            self.tally(Stage::Payments, &record.id, result);
        }
        self.check_transfers().await?;
        self.stage_done(Stage::Payments);

        self.checkpoint(Stage::Balances.name())?;
        for record in &archive.data.player_balances {
            let result = self.import_balance(record).await;
            self.tally(Stage::Balances, &record.player_id, result);
        }
        self.stage_done(Stage::Balances);
        Ok(())
    }

    async fn import_location(&mut self, record: &LocationRecord) -> ResultEngine<Outcome> {
        let name = normalize_required_name(&record.name, "location")?;
        let address = normalize_optional_text(record.address.as_deref());
        let notes = normalize_optional_text(record.notes.as_deref());

        let tx = self.conn.begin().await?;
        let existing = self
            .engine
            .find_location_by_name(&tx, self.organizer_id, &name)
            .await?;
        let (id, outcome) = match existing {
            None => {
                let mut location = Location::new(self.organizer_id, name);
                location.address = address;
                location.notes = notes;
                if let Some(created_at) = record.created_at {
                    location.created_at = created_at;
                }
                locations::ActiveModel::from(&location).insert(&tx).await?;
                (location.id, Outcome::Created)
            }
            Some(model) => {
                let id = parse_uuid(&model.id, "location")?;
                let mut changed = false;
                let mut active = locations::ActiveModel {
                    id: ActiveValue::Unchanged(model.id.clone()),
                    ..Default::default()
                };
                match self.options.conflict {
                    ConflictMode::SkipDuplicates => {}
                    ConflictMode::ReplaceDuplicates => {
                        active.name = ActiveValue::Set(name);
                        active.address = ActiveValue::Set(address);
                        active.notes = ActiveValue::Set(notes);
                        changed = true;
                    }
                    ConflictMode::MergeData => {
                        if let Some(value) = merged(&model.address, &address) {
                            active.address = ActiveValue::Set(value);
                            changed = true;
                        }
                        if let Some(value) = merged(&model.notes, &notes) {
                            active.notes = ActiveValue::Set(value);
                            changed = true;
                        }
                    }
                }
                if changed {
                    active.update(&tx).await?;
                    (id, Outcome::Updated)
                } else {
                    (id, Outcome::Skipped)
                }
            }
        };
        tx.commit().await?;
        self.location_ids.insert(record.id.clone(), id);
        Ok(outcome)
    }

    async fn import_player(&mut self, record: &PlayerRecord) -> ResultEngine<Outcome> {
        let name = normalize_required_name(&record.name, "player")?;
        let phone = normalize_optional_text(record.phone.as_deref());
        let notes = normalize_optional_text(record.notes.as_deref());
        let updated_at = record.updated_at.unwrap_or_else(Utc::now);

        let tx = self.conn.begin().await?;
        let existing = self
            .engine
            .find_player_by_name(&tx, self.organizer_id, &name)
            .await?;
        let (id, outcome) = match existing {
            None => {
                let mut player = Player::new(self.organizer_id, name, record.is_temporary);
                player.phone = phone;
                player.notes = notes;
                player.is_active = record.is_active;
                player.created_at = record.created_at.unwrap_or(player.created_at);
                player.updated_at = updated_at;
                players::ActiveModel::from(&player).insert(&tx).await?;
                (player.id, Outcome::Created)
            }
            Some(model) => {
                let id = parse_uuid(&model.id, "player")?;
                let mut changed = false;
                let mut active = players::ActiveModel {
                    id: ActiveValue::Unchanged(model.id.clone()),
                    ..Default::default()
                };
                match self.options.conflict {
                    ConflictMode::SkipDuplicates => {}
                    ConflictMode::ReplaceDuplicates => {
                        active.name_norm = ActiveValue::Set(name_key(&name));
                        active.name = ActiveValue::Set(name);
                        active.phone = ActiveValue::Set(phone);
                        active.notes = ActiveValue::Set(notes);
                        active.is_temporary = ActiveValue::Set(record.is_temporary);
                        active.is_active = ActiveValue::Set(record.is_active);
                        changed = true;
                    }
                    ConflictMode::MergeData => {
                        if let Some(value) = merged(&model.phone, &phone) {
                            active.phone = ActiveValue::Set(value);
                            changed = true;
                        }
                        if let Some(value) = merged(&model.notes, &notes) {
                            active.notes = ActiveValue::Set(value);
                            changed = true;
                        }
                    }
                }
                if changed {
                    active.updated_at = ActiveValue::Set(updated_at);
                    active.update(&tx).await?;
                    (id, Outcome::Updated)
                } else {
                    (id, Outcome::Skipped)
                }
            }
        };
        tx.commit().await?;
        self.player_ids.insert(record.id.clone(), id);
        Ok(outcome)
    }

    /// Stored session on the same date not yet matched by this run.
    async fn find_session_on_date(
        &self,
        tx: &DatabaseTransaction,
        record: &SessionRecord,
    ) -> ResultEngine<Option<sessions::Model>> {
        let candidates = sessions::Entity::find()
            .filter(sessions::Column::OrganizerId.eq(self.organizer_id))
            .filter(sessions::Column::Date.eq(record.date))
            .order_by_asc(sessions::Column::CreatedAt)
            .order_by_asc(sessions::Column::Id)
            .all(tx)
            .await?;
        for model in candidates {
            if !self.claimed_sessions.contains(&parse_uuid(&model.id, "session")?) {
                return Ok(Some(model));
            }
        }
        Ok(None)
    }

    async fn import_session(&mut self, record: &SessionRecord) -> ResultEngine<Outcome> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            organizer_id: self.organizer_id.to_string(),
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            location: normalize_optional_text(record.location.as_deref()),
            court_cost: record.court_cost,
            shuttlecock_cost: record.shuttlecock_cost,
            other_costs: record.other_costs,
            participant_count: record.participant_count,
            status: record.status,
            notes: normalize_optional_text(record.notes.as_deref()),
            created_at: record.created_at.unwrap_or(now),
            updated_at: record.updated_at.unwrap_or(now),
        };
        session.validate_costs()?;

        let tx = self.conn.begin().await?;
        let (id, outcome) = match self.find_session_on_date(&tx, record).await? {
            None => {
                sessions::ActiveModel::from(&session).insert(&tx).await?;
                (session.id, Outcome::Created)
            }
            Some(model) => {
                let id = parse_uuid(&model.id, "session")?;
                let mut changed = false;
                let mut active = sessions::ActiveModel {
                    id: ActiveValue::Unchanged(model.id.clone()),
                    ..Default::default()
                };
                match self.options.conflict {
                    ConflictMode::SkipDuplicates => {}
                    ConflictMode::ReplaceDuplicates => {
                        active = sessions::ActiveModel::from(&session);
                        active.id = ActiveValue::Unchanged(model.id.clone());
                        active.created_at = ActiveValue::NotSet;
                        changed = true;
                    }
                    ConflictMode::MergeData => {
                        if let Some(value) = merged(&model.start_time, &session.start_time) {
                            active.start_time = ActiveValue::Set(value);
                            changed = true;
                        }
                        if let Some(value) = merged(&model.end_time, &session.end_time) {
                            active.end_time = ActiveValue::Set(value);
                            changed = true;
                        }
                        if let Some(value) = merged(&model.location, &session.location) {
                            active.location = ActiveValue::Set(value);
                            changed = true;
                        }
                        if let Some(value) = merged(&model.notes, &session.notes) {
                            active.notes = ActiveValue::Set(value);
                            changed = true;
                        }
                    }
                }
                if changed {
                    active.update(&tx).await?;
                    self.recompute_session_players(&tx, &model.id).await?;
                    (id, Outcome::Updated)
                } else {
                    (id, Outcome::Skipped)
                }
            }
        };
        tx.commit().await?;
        self.claimed_sessions.insert(id);
        self.session_ids.insert(record.id.clone(), id);
        Ok(outcome)
    }

    /// A replaced session may have changed status, which changes its
    /// participants' balances.
    async fn recompute_session_players(
        &self,
        tx: &DatabaseTransaction,
        session_id: &str,
    ) -> ResultEngine<()> {
        let ids = self
            .engine
            .participant_ids(tx, parse_uuid(session_id, "session")?)
            .await?;
        self.engine
            .recompute_many_in_tx(tx, self.organizer_id, ids)
            .await
    }

    async fn import_participant(&mut self, record: &ParticipantRecord) -> ResultEngine<Outcome> {
        let Some(&session_id) = self.session_ids.get(&record.session_id) else {
            let reason = format!("session {} was not imported", record.session_id);
            return Ok(self.skip(Stage::Participants, &record.id, reason));
        };
        let Some(&player_id) = self.player_ids.get(&record.player_id) else {
            let reason = format!("player {} was not imported", record.player_id);
            return Ok(self.skip(Stage::Participants, &record.id, reason));
        };

        let mut participant = SessionParticipant::new(session_id, player_id, record.amount_owed);
        if let Some(created_at) = record.created_at {
            participant.created_at = created_at;
        }

        let tx = self.conn.begin().await?;
        let attempt = {
            let savepoint = tx.begin().await?;
            match session_participants::ActiveModel::from(&participant)
                .insert(&savepoint)
                .await
            {
                Ok(_) => {
                    savepoint.commit().await?;
                    Ok(())
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    Err(err)
                }
            }
        };

        let outcome = match attempt {
            Ok(()) => Outcome::Created,
            Err(err) if is_unique_violation(&err) => {
                let existing = session_participants::Entity::find()
                    .filter(session_participants::Column::SessionId.eq(session_id.to_string()))
                    .filter(session_participants::Column::PlayerId.eq(player_id.to_string()))
                    .one(&tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("participant not exists".to_string()))?;
                let amount = record.amount_owed.map(|m| m.minor());
                let replacement = match self.options.conflict {
                    ConflictMode::SkipDuplicates => None,
                    ConflictMode::ReplaceDuplicates => {
                        (existing.amount_owed_minor != amount).then_some(amount)
                    }
                    ConflictMode::MergeData => merged(&existing.amount_owed_minor, &amount),
                };
                match replacement {
                    Some(amount) => {
                        let active = session_participants::ActiveModel {
                            id: ActiveValue::Unchanged(existing.id),
                            amount_owed_minor: ActiveValue::Set(amount),
                            ..Default::default()
                        };
                        active.update(&tx).await?;
                        Outcome::Updated
                    }
                    None => Outcome::Skipped,
                }
            }
            Err(err) => return Err(err.into()),
        };

        if outcome != Outcome::Skipped {
            self.engine
                .recompute_in_tx(&tx, self.organizer_id, player_id)
                .await?;
        }
        tx.commit().await?;
        Ok(outcome)
    }

    async fn import_payment(&mut self, record: &PaymentRecord) -> ResultEngine<Outcome> {
        let Some(&player_id) = self.player_ids.get(&record.player_id) else {
            let reason = format!("player {} was not imported", record.player_id);
            return Ok(self.skip(Stage::Payments, &record.id, reason));
        };
        let mut payment = Payment::new(
            self.organizer_id,
            player_id,
            record.amount,
            record.method,
            record.payment_date,
        )?;
        payment.reference_number = normalize_optional_text(record.reference_number.as_deref());
        payment.notes = normalize_optional_text(record.notes.as_deref());
        if let Some(created_at) = record.created_at {
            payment.created_at = created_at;
        }

        let tx = self.conn.begin().await?;
        let mut query = payments::Entity::find()
            .filter(payments::Column::OrganizerId.eq(self.organizer_id))
            .filter(payments::Column::PlayerId.eq(player_id.to_string()))
            .filter(payments::Column::PaymentDate.eq(payment.payment_date))
            .filter(payments::Column::AmountMinor.eq(payment.amount.minor()))
            .filter(payments::Column::Method.eq(payment.method.as_str()));
        query = match &payment.reference_number {
            Some(reference) => query.filter(payments::Column::ReferenceNumber.eq(reference.as_str())),
            None => query.filter(payments::Column::ReferenceNumber.is_null()),
        };

        // Identical payments are legitimate: each archive record claims its
        // own stored row.
        let existing = query
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(&tx)
            .await?
            .into_iter()
            .find(|model| !self.claimed_payments.contains(&model.id));

        let (stored_id, outcome) = match existing {
            None => {
                payments::ActiveModel::from(&payment).insert(&tx).await?;
                (payment.id.to_string(), Outcome::Created)
            }
            Some(model) => {
                let stored_id = model.id.clone();
                let notes = match self.options.conflict {
                    ConflictMode::SkipDuplicates => None,
                    ConflictMode::ReplaceDuplicates => {
                        (model.notes != payment.notes).then(|| payment.notes.clone())
                    }
                    ConflictMode::MergeData => merged(&model.notes, &payment.notes),
                };
                let outcome = match notes {
                    Some(notes) => {
                        let active = payments::ActiveModel {
                            id: ActiveValue::Unchanged(model.id),
                            notes: ActiveValue::Set(notes),
                            ..Default::default()
                        };
                        active.update(&tx).await?;
                        Outcome::Updated
                    }
                    None => Outcome::Skipped,
                };
                (stored_id, outcome)
            }
        };

        if outcome == Outcome::Created {
            self.engine
                .recompute_in_tx(&tx, self.organizer_id, player_id)
                .await?;
        }
        tx.commit().await?;
        self.claimed_payments.insert(stored_id);
        if payment.method == PaymentMethod::CreditTransfer
            && let Some(reference) = payment.reference_number
        {
            self.transfer_references.insert(reference);
        }
        Ok(outcome)
    }

    /// Warns about credit transfers left with a single leg, e.g. when one of
    /// the two players was not imported.
    async fn check_transfers(&mut self) -> ResultEngine<()> {
        for reference in std::mem::take(&mut self.transfer_references) {
            let legs = payments::Entity::find()
                .filter(payments::Column::OrganizerId.eq(self.organizer_id))
                .filter(payments::Column::Method.eq(PaymentMethod::CreditTransfer.as_str()))
                .filter(payments::Column::ReferenceNumber.eq(reference.as_str()))
                .all(self.conn)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            if CreditTransfer::from_legs(&legs).is_err() {
                tracing::warn!(%reference, legs = legs.len(), "credit transfer is unpaired");
                self.report.warnings.push(format!(
                    "credit transfer {reference} has {} leg(s) after import",
                    legs.len()
                ));
            }
        }
        Ok(())
    }

    /// Balances are re-derived from the imported facts, never copied.
    async fn import_balance(&mut self, record: &BalanceRecord) -> ResultEngine<Outcome> {
        let Some(&player_id) = self.player_ids.get(&record.player_id) else {
            let reason = format!("player {} was not imported", record.player_id);
            return Ok(self.skip(Stage::Balances, &record.player_id, reason));
        };
        let tx = self.conn.begin().await?;
        let (balance, written) = self
            .engine
            .recompute_tracked_in_tx(&tx, self.organizer_id, player_id)
            .await?;
        tx.commit().await?;

        if balance.current_balance != record.current_balance {
            tracing::warn!(
                %player_id,
                archived = %record.current_balance,
                recomputed = %balance.current_balance,
                "archived balance differs from recomputed balance"
            );
            self.report.warnings.push(format!(
                "player_balances[{}]: archived balance {} differs from recomputed {}",
                record.player_id, record.current_balance, balance.current_balance
            ));
        }
        Ok(if written {
            Outcome::Updated
        } else {
            Outcome::Skipped
        })
    }
}

impl Engine {
    /// Parses a JSON archive and imports it. See [`Engine::import_archive`].
    pub async fn import_archive_str(
        &self,
        organizer_id: &str,
        input: &str,
        options: &ImportOptions,
    ) -> ResultEngine<ImportResult> {
        let document: Value = serde_json::from_str(input)
            .map_err(|err| EngineError::InvalidArchive(format!("cannot parse archive: {err}")))?;
        self.import_archive(organizer_id, document, options).await
    }

    /// Imports an archive document into the organizer's scope.
    ///
    /// The whole document is validated first; a defective archive is
    /// rejected with every defect listed and nothing written. Records are
    /// then imported stage by stage (locations, players, sessions,
    /// participants, payments, balances) under fresh ids. Each record is its
    /// own transaction, so a failing record is reported and the run goes on.
    ///
    /// With `validate_only` the same run happens inside a transaction that is
    /// rolled back, so the report shows what would happen.
    pub async fn import_archive(
        &self,
        organizer_id: &str,
        document: Value,
        options: &ImportOptions,
    ) -> ResultEngine<ImportResult> {
        with_tx!(self, |db_tx| self.require_organizer(&db_tx, organizer_id).await)?;

        let archive = match parse_validated(document) {
            Ok(archive) => archive,
            Err(errors) => {
                tracing::warn!(organizer_id = %organizer_id, errors = errors.len(), "archive rejected");
                return Ok(ImportResult::rejected(errors));
            }
        };
        tracing::info!(
            organizer_id = %organizer_id,
            records = archive.data.total_records(),
            conflict = ?options.conflict,
            validate_only = options.validate_only,
            clear_existing_data = options.clear_existing_data,
            "import started"
        );

        if options.validate_only {
            let dry_run = self.database.begin().await?;
            let mut report = Importer::new(self, &dry_run, organizer_id, options)
                .run(&archive)
                .await;
            dry_run.rollback().await?;
            report.validate_only = true;
            let total = report.counts.total();
            report.message = format!(
                "validation passed, nothing written: would create {}, update {}, skip {}, fail {}",
                total.created, total.updated, total.skipped, total.errors
            );
            return Ok(report);
        }

        let report = Importer::new(self, &self.database, organizer_id, options)
            .run(&archive)
            .await;
        tracing::info!(organizer_id = %organizer_id, success = report.success, "{}", report.message);
        Ok(report)
    }

    /// Deletes every record of the organizer (the organizer itself stays).
    ///
    /// Returns the number of rows removed.
    pub async fn reset_organizer_data(&self, organizer_id: &str) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let removed = clear_organizer_rows(&db_tx, organizer_id).await?;
            tracing::warn!(organizer_id = %organizer_id, removed, "organizer data reset");
            Ok(removed)
        })
    }
}
