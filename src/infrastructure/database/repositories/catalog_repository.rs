//! SeaORM implementation of the catalog lookups
//!
//! Sessions, users and cinemas are owned by other subsystems. These
//! queries only read them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};

use crate::domain::catalog::{OwnerLookup, Session, SessionLookup, UserBasic, UserLookup};
use crate::infrastructure::database::entities::{cinema, event, movie, session, user};
use crate::shared::{DomainError, DomainResult};

pub struct SeaOrmCatalogRepository {
    db: DatabaseConnection,
}

impl SeaOrmCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> DomainError {
    DomainError::Internal(format!("Database error: {}", e))
}

fn user_to_domain(m: user::Model) -> UserBasic {
    UserBasic {
        id: m.id,
        name: m.name,
        email: m.email,
        role: m.role.into(),
    }
}

#[derive(Debug, FromQueryResult)]
struct SessionRow {
    id: i32,
    price: i32,
    starts_at: DateTime<Utc>,
    room_id: i32,
    event_id: i32,
    cinema_id: i32,
    movie_title: Option<String>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            price: row.price,
            starts_at: row.starts_at,
            room_id: row.room_id,
            event_id: row.event_id,
            cinema_id: row.cinema_id,
            movie_title: row.movie_title,
        }
    }
}

#[async_trait]
impl SessionLookup for SeaOrmCatalogRepository {
    /// Soft-deleted sessions are treated as absent.
    async fn find_session(&self, session_id: i32) -> DomainResult<Option<Session>> {
        let row = session::Entity::find()
            .select_only()
            .column_as(session::Column::Id, "id")
            .column_as(session::Column::Price, "price")
            .column_as(session::Column::StartsAt, "starts_at")
            .column_as(session::Column::RoomId, "room_id")
            .column_as(session::Column::EventId, "event_id")
            .column_as(event::Column::CinemaId, "cinema_id")
            .column_as(movie::Column::Title, "movie_title")
            .join(JoinType::InnerJoin, session::Relation::Event.def())
            .join(JoinType::LeftJoin, event::Relation::Movie.def())
            .filter(session::Column::Id.eq(session_id))
            .filter(session::Column::DeletedAt.is_null())
            .into_model::<SessionRow>()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Session::from))
    }
}

#[async_trait]
impl UserLookup for SeaOrmCatalogRepository {
    async fn find_user(&self, user_id: i32) -> DomainResult<Option<UserBasic>> {
        let model = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_to_domain))
    }
}

#[async_trait]
impl OwnerLookup for SeaOrmCatalogRepository {
    async fn find_cinema_owner(&self, cinema_id: i32) -> DomainResult<Option<UserBasic>> {
        let found = cinema::Entity::find_by_id(cinema_id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(found.and_then(|(_, owner)| owner).map(user_to_domain))
    }
}
