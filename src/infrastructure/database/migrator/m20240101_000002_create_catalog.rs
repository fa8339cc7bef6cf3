//! Create catalog tables: cinemas, movies, events, rooms, sessions
//!
//! Only the columns the booking core reads are created here.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cinemas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cinemas::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cinemas::UserId).integer().not_null())
                    .col(ColumnDef::new(Cinemas::Name).string().not_null())
                    .col(ColumnDef::new(Cinemas::Description).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cinemas_user")
                            .from(Cinemas::Table, Cinemas::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movies::Title).string().not_null())
                    .col(ColumnDef::new(Movies::Language).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::CinemaId).integer().not_null())
                    .col(ColumnDef::new(Events::MovieId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_cinema")
                            .from(Events::Table, Events::CinemaId)
                            .to(Cinemas::Table, Cinemas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_movie")
                            .from(Events::Table, Events::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rooms::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rooms::CinemaId).integer().not_null())
                    .col(ColumnDef::new(Rooms::Number).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rooms_cinema")
                            .from(Rooms::Table, Rooms::CinemaId)
                            .to(Cinemas::Table, Cinemas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::EventId).integer().not_null())
                    .col(ColumnDef::new(Sessions::RoomId).integer().not_null())
                    .col(ColumnDef::new(Sessions::Price).integer().not_null())
                    .col(
                        ColumnDef::new(Sessions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_event")
                            .from(Sessions::Table, Sessions::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_room")
                            .from(Sessions::Table, Sessions::RoomId)
                            .to(Rooms::Table, Rooms::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Movies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cinemas::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
pub enum Cinemas {
    Table,
    Id,
    UserId,
    Name,
    Description,
}

#[derive(Iden)]
pub enum Movies {
    Table,
    Id,
    Title,
    Language,
}

#[derive(Iden)]
pub enum Events {
    Table,
    Id,
    CinemaId,
    MovieId,
}

#[derive(Iden)]
pub enum Rooms {
    Table,
    Id,
    CinemaId,
    Number,
}

#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    EventId,
    RoomId,
    Price,
    StartsAt,
    DeletedAt,
}
