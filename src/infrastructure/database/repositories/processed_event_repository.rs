//! SeaORM implementation of ProcessedEventRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Set, SqlErr};

use crate::domain::payment::{ProcessedEvent, ProcessedEventRepository};
use crate::infrastructure::database::entities::processed_event;
use crate::shared::{DomainError, DomainResult};

pub struct SeaOrmProcessedEventRepository {
    db: DatabaseConnection,
}

impl SeaOrmProcessedEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> DomainError {
    DomainError::Internal(format!("Database error: {}", e))
}

#[async_trait]
impl ProcessedEventRepository for SeaOrmProcessedEventRepository {
    async fn is_processed(&self, event_id: &str) -> DomainResult<bool> {
        let count = processed_event::Entity::find_by_id(event_id.to_string())
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn record(&self, event: &ProcessedEvent) -> DomainResult<bool> {
        debug!("Recording processed event: {}", event.event_id);

        let model = processed_event::ActiveModel {
            event_id: Set(event.event_id.clone()),
            event_type: Set(event.event_type.clone()),
            processed_at: Set(event.processed_at),
        };
        match processed_event::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(db_err(e)),
        }
    }
}
