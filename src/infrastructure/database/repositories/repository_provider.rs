//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::catalog::{OwnerLookup, SessionLookup, UserLookup};
use crate::domain::payment::ProcessedEventRepository;
use crate::domain::repositories::RepositoryProvider;

use super::booking_repository::SeaOrmBookingRepository;
use super::catalog_repository::SeaOrmCatalogRepository;
use super::processed_event_repository::SeaOrmProcessedEventRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let session = repos.sessions().find_session(5).await?;
/// let booking = repos.bookings().find_by_id(12).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    bookings: SeaOrmBookingRepository,
    processed_events: SeaOrmProcessedEventRepository,
    catalog: SeaOrmCatalogRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            bookings: SeaOrmBookingRepository::new(db.clone()),
            processed_events: SeaOrmProcessedEventRepository::new(db.clone()),
            catalog: SeaOrmCatalogRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn processed_events(&self) -> &dyn ProcessedEventRepository {
        &self.processed_events
    }

    fn sessions(&self) -> &dyn SessionLookup {
        &self.catalog
    }

    fn users(&self) -> &dyn UserLookup {
        &self.catalog
    }

    fn owners(&self) -> &dyn OwnerLookup {
        &self.catalog
    }
}
