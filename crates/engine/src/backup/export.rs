use chrono::Utc;
use sea_orm::{
    Condition, ConnectionTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, TransactionTrait, prelude::*,
};

use crate::{
    Money, ResultEngine, locations,
    ops::{Engine, with_tx},
    payments, player_balances, players, session_participants, sessions,
};

use super::{
    APP_VERSION, Archive, ArchiveData, ArchiveMetadata, ArchiveStatistics, ArchiveTotals,
    BalanceRecord, ExportOptions, LocationRecord, PAGE_SIZE, ParticipantRecord, PaymentRecord,
    PlayerRecord, SessionDateRange, SessionRecord,
};

/// Reads every row of `select`, one page of [`PAGE_SIZE`] at a time.
///
/// `select` must be totally ordered or rows may repeat across pages.
async fn fetch_paged<'db, C, E>(db: &'db C, select: Select<E>) -> ResultEngine<Vec<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync + 'db,
{
    let mut pages = select.paginate(db, PAGE_SIZE);
    let mut rows = Vec::new();
    while let Some(page) = pages.fetch_and_next().await? {
        rows.extend(page);
    }
    Ok(rows)
}

fn session_condition(organizer_id: &str, options: &ExportOptions) -> Condition {
    let mut condition = Condition::all().add(sessions::Column::OrganizerId.eq(organizer_id));
    if let Some(from) = options.range.from {
        condition = condition.add(sessions::Column::Date.gte(from));
    }
    if let Some(to) = options.range.to {
        condition = condition.add(sessions::Column::Date.lte(to));
    }
    if let Some(ids) = &options.session_ids {
        condition = condition.add(sessions::Column::Id.is_in(ids.iter().map(ToString::to_string)));
    }
    condition
}

pub(crate) fn statistics(data: &ArchiveData) -> ArchiveStatistics {
    let handled: Money = data.payments.iter().map(|p| p.amount).sum();
    ArchiveStatistics {
        date_range: SessionDateRange {
            earliest_session: data.sessions.iter().map(|s| s.date).min(),
            latest_session: data.sessions.iter().map(|s| s.date).max(),
        },
        totals: ArchiveTotals {
            total_sessions: data.sessions.len() as u64,
            total_players: data.players.len() as u64,
            total_payments: data.payments.len() as u64,
            total_amount_handled: handled.round_to_tenth(),
        },
    }
}

impl Engine {
    /// Builds an archive of the organizer's records.
    ///
    /// Everything is read inside one transaction so the archive is a
    /// consistent snapshot. Sessions carry only their raw cost inputs;
    /// participants are restricted to the exported sessions.
    pub async fn export_archive(
        &self,
        organizer_id: &str,
        options: &ExportOptions,
    ) -> ResultEngine<Archive> {
        options.range.validate()?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;

            let locations = fetch_paged(
                &db_tx,
                locations::Entity::find()
                    .filter(locations::Column::OrganizerId.eq(organizer_id))
                    .order_by_asc(locations::Column::CreatedAt)
                    .order_by_asc(locations::Column::Id),
            )
            .await?
            .into_iter()
            .map(LocationRecord::from)
            .collect::<Vec<_>>();

            let players = fetch_paged(
                &db_tx,
                players::Entity::find()
                    .filter(players::Column::OrganizerId.eq(organizer_id))
                    .order_by_asc(players::Column::CreatedAt)
                    .order_by_asc(players::Column::Id),
            )
            .await?
            .into_iter()
            .map(PlayerRecord::from)
            .collect::<Vec<_>>();

            let sessions = fetch_paged(
                &db_tx,
                sessions::Entity::find()
                    .filter(session_condition(organizer_id, options))
                    .order_by_asc(sessions::Column::Date)
                    .order_by_asc(sessions::Column::Id),
            )
            .await?
            .into_iter()
            .map(SessionRecord::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

            let session_participants = fetch_paged(
                &db_tx,
                session_participants::Entity::find()
                    .join(
                        JoinType::InnerJoin,
                        session_participants::Relation::Sessions.def(),
                    )
                    .filter(session_condition(organizer_id, options))
                    .order_by_asc(session_participants::Column::SessionId)
                    .order_by_asc(session_participants::Column::Id),
            )
            .await?
            .into_iter()
            .map(ParticipantRecord::from)
            .collect::<Vec<_>>();

            let mut payment_query =
                payments::Entity::find().filter(payments::Column::OrganizerId.eq(organizer_id));
            if let Some(from) = options.range.from {
                payment_query = payment_query.filter(payments::Column::PaymentDate.gte(from));
            }
            if let Some(to) = options.range.to {
                payment_query = payment_query.filter(payments::Column::PaymentDate.lte(to));
            }
            let payments = fetch_paged(
                &db_tx,
                payment_query
                    .order_by_asc(payments::Column::PaymentDate)
                    .order_by_asc(payments::Column::Id),
            )
            .await?
            .into_iter()
            .map(PaymentRecord::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

            let player_balances = fetch_paged(
                &db_tx,
                player_balances::Entity::find()
                    .filter(player_balances::Column::OrganizerId.eq(organizer_id))
                    .order_by_asc(player_balances::Column::PlayerId),
            )
            .await?
            .into_iter()
            .map(BalanceRecord::from)
            .collect::<Vec<_>>();

            let data = ArchiveData {
                players,
                sessions,
                session_participants,
                payments,
                player_balances,
                locations,
            };
            let archive = Archive {
                metadata: ArchiveMetadata {
                    export_date: Utc::now(),
                    app_version: APP_VERSION.to_string(),
                    organizer_id: organizer_id.to_string(),
                    total_records: data.total_records(),
                    export_type: options.export_type(),
                },
                statistics: statistics(&data),
                data,
            };
            tracing::info!(
                organizer_id = %organizer_id,
                export_type = ?archive.metadata.export_type,
                records = archive.metadata.total_records,
                "archive exported"
            );
            Ok(archive)
        })
    }
}
