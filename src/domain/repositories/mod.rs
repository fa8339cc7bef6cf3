//! Repository access for the domain layer

use super::booking::BookingRepository;
use super::catalog::{OwnerLookup, SessionLookup, UserLookup};
use super::payment::ProcessedEventRepository;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let session = repos.sessions().find_session(5).await?;
///     let booked = repos.bookings().find_by_session_and_seats(5, &seats).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn bookings(&self) -> &dyn BookingRepository;
    fn processed_events(&self) -> &dyn ProcessedEventRepository;
    fn sessions(&self) -> &dyn SessionLookup;
    fn users(&self) -> &dyn UserLookup;
    fn owners(&self) -> &dyn OwnerLookup;
}
