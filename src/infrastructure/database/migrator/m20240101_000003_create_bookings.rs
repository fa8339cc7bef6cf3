//! Create bookings table
//!
//! At most one PENDING or CONFIRMED booking may exist per
//! (session_id, place). The partial unique index enforces this even when
//! two writers pass the application-level seat check at the same time;
//! CANCELED rows are outside the index so a seat can be booked again.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000002_create_catalog::Sessions;

/// Name of the partial unique index over live seats
pub const ACTIVE_SEAT_INDEX: &str = "uq_bookings_active_seat";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::SessionId).integer().not_null())
                    .col(ColumnDef::new(Bookings::UserId).integer().not_null())
                    .col(ColumnDef::new(Bookings::Place).string().not_null())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::CanceledAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_session")
                            .from(Bookings::Table, Bookings::SessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_user")
                            .from(Bookings::Table, Bookings::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_session_place")
                    .table(Bookings::Table)
                    .col(Bookings::SessionId)
                    .col(Bookings::Place)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status_created")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .col(Bookings::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the index builder.
        // The statement is valid on both SQLite and PostgreSQL.
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON bookings (session_id, place) \
                 WHERE status <> 'CANCELED'",
                ACTIVE_SEAT_INDEX
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    SessionId,
    UserId,
    Place,
    Status,
    CreatedAt,
    UpdatedAt,
    CanceledAt,
}
