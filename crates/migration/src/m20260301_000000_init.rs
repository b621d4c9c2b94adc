//! Initial schema for Shuttlebook.
//!
//! - `organizers`: the tenant scope every other row belongs to
//! - `locations`: venue picklist
//! - `players`: roster, including temporary drop-ins
//! - `sessions`: raw cost inputs of each playing session
//! - `session_participants`: one charge per player per session
//! - `payments`: money handed over, including credit transfer legs
//! - `player_balances`: per-player projection of the two fact tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Organizers {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Locations {
    Table,
    Id,
    OrganizerId,
    Name,
    NameNorm,
    Address,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum Players {
    Table,
    Id,
    OrganizerId,
    Name,
    NameNorm,
    Phone,
    IsTemporary,
    IsActive,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    OrganizerId,
    Date,
    StartTime,
    EndTime,
    Location,
    CourtCostMinor,
    ShuttlecockCostMinor,
    OtherCostsMinor,
    ParticipantCount,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SessionParticipants {
    Table,
    Id,
    SessionId,
    PlayerId,
    AmountOwedMinor,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    OrganizerId,
    PlayerId,
    AmountMinor,
    Method,
    PaymentDate,
    ReferenceNumber,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum PlayerBalances {
    Table,
    OrganizerId,
    PlayerId,
    TotalOwedMinor,
    TotalPaidMinor,
    CurrentBalanceMinor,
    LastSessionDate,
    LastPaymentDate,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Organizers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Organizers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizers::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organizers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Locations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Locations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Locations::OrganizerId).string().not_null())
                    .col(ColumnDef::new(Locations::Name).string().not_null())
                    .col(ColumnDef::new(Locations::NameNorm).string().not_null())
                    .col(ColumnDef::new(Locations::Address).string())
                    .col(ColumnDef::new(Locations::Notes).string())
                    .col(
                        ColumnDef::new(Locations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-locations-organizer_id")
                            .from(Locations::Table, Locations::OrganizerId)
                            .to(Organizers::Table, Organizers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-locations-organizer_id-name_norm")
                    .table(Locations::Table)
                    .col(Locations::OrganizerId)
                    .col(Locations::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Players
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Players::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Players::OrganizerId).string().not_null())
                    .col(ColumnDef::new(Players::Name).string().not_null())
                    .col(ColumnDef::new(Players::NameNorm).string().not_null())
                    .col(ColumnDef::new(Players::Phone).string())
                    .col(
                        ColumnDef::new(Players::IsTemporary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Players::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Players::Notes).string())
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Players::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-players-organizer_id")
                            .from(Players::Table, Players::OrganizerId)
                            .to(Organizers::Table, Organizers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-players-organizer_id-name_norm")
                    .table(Players::Table)
                    .col(Players::OrganizerId)
                    .col(Players::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::OrganizerId).string().not_null())
                    .col(ColumnDef::new(Sessions::Date).date().not_null())
                    .col(ColumnDef::new(Sessions::StartTime).time())
                    .col(ColumnDef::new(Sessions::EndTime).time())
                    .col(ColumnDef::new(Sessions::Location).string())
                    .col(
                        ColumnDef::new(Sessions::CourtCostMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::ShuttlecockCostMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::OtherCostsMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Sessions::ParticipantCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Sessions::Status).string().not_null())
                    .col(ColumnDef::new(Sessions::Notes).string())
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-organizer_id")
                            .from(Sessions::Table, Sessions::OrganizerId)
                            .to(Organizers::Table, Organizers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-organizer_id-date")
                    .table(Sessions::Table)
                    .col(Sessions::OrganizerId)
                    .col(Sessions::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Session participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SessionParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionParticipants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionParticipants::SessionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionParticipants::PlayerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionParticipants::AmountOwedMinor).big_integer())
                    .col(
                        ColumnDef::new(SessionParticipants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-session_participants-session_id")
                            .from(SessionParticipants::Table, SessionParticipants::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-session_participants-player_id")
                            .from(SessionParticipants::Table, SessionParticipants::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-session_participants-session_id-player_id")
                    .table(SessionParticipants::Table)
                    .col(SessionParticipants::SessionId)
                    .col(SessionParticipants::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-session_participants-player_id")
                    .table(SessionParticipants::Table)
                    .col(SessionParticipants::PlayerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::OrganizerId).string().not_null())
                    .col(ColumnDef::new(Payments::PlayerId).string().not_null())
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
                    .col(ColumnDef::new(Payments::ReferenceNumber).string())
                    .col(ColumnDef::new(Payments::Notes).string())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-organizer_id")
                            .from(Payments::Table, Payments::OrganizerId)
                            .to(Organizers::Table, Organizers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-player_id")
                            .from(Payments::Table, Payments::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-player_id")
                    .table(Payments::Table)
                    .col(Payments::PlayerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-organizer_id-reference_number")
                    .table(Payments::Table)
                    .col(Payments::OrganizerId)
                    .col(Payments::ReferenceNumber)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Player balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PlayerBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlayerBalances::OrganizerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerBalances::PlayerId).string().not_null())
                    .col(
                        ColumnDef::new(PlayerBalances::TotalOwedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlayerBalances::TotalPaidMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlayerBalances::CurrentBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PlayerBalances::LastSessionDate).date())
                    .col(ColumnDef::new(PlayerBalances::LastPaymentDate).date())
                    .col(
                        ColumnDef::new(PlayerBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PlayerBalances::OrganizerId)
                            .col(PlayerBalances::PlayerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-player_balances-organizer_id")
                            .from(PlayerBalances::Table, PlayerBalances::OrganizerId)
                            .to(Organizers::Table, Organizers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-player_balances-player_id")
                            .from(PlayerBalances::Table, PlayerBalances::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-player_balances-organizer_id-current_balance")
                    .table(PlayerBalances::Table)
                    .col(PlayerBalances::OrganizerId)
                    .col(PlayerBalances::CurrentBalanceMinor)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlayerBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizers::Table).to_owned())
            .await?;
        Ok(())
    }
}
