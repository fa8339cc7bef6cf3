//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingDetails, ConfirmOutcome};
use crate::domain::payment::ProcessedEvent;
use crate::shared::{DomainResult, PaginatedResult, PaginationParams};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert one PENDING booking per seat, all or nothing.
    ///
    /// The store's active-seat uniqueness decides: any seat already held by a
    /// PENDING or CONFIRMED booking, including one claimed by a concurrent
    /// writer, fails the whole call with `SeatConflict` listing the held seats.
    async fn create_pending(
        &self,
        session_id: i32,
        user_id: i32,
        seats: &[String],
    ) -> DomainResult<Vec<Booking>>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>>;

    /// Find bookings of one session by seat code, any status
    async fn find_by_session_and_seats(
        &self,
        session_id: i32,
        seats: &[String],
    ) -> DomainResult<Vec<Booking>>;

    async fn find_details(&self, id: i32) -> DomainResult<Option<BookingDetails>>;

    /// Page through booking details, optionally filtered by a free-text
    /// search over seat code, session id, cinema name and movie title.
    async fn list_details(
        &self,
        pagination: PaginationParams,
        search: Option<&str>,
    ) -> DomainResult<PaginatedResult<BookingDetails>>;

    /// Move a PENDING booking to CANCELED. Returns `false` when the booking
    /// was not PENDING at the time of the update.
    async fn cancel_pending(&self, id: i32) -> DomainResult<bool>;

    /// Confirm every PENDING booking of `session_id` whose seat is in
    /// `seats`, and record `event` as processed, in one transaction.
    ///
    /// If `event` has already been recorded the transaction is rolled back
    /// and `AlreadyProcessed` is returned; no booking changes. The returned
    /// confirmation lists exactly the rows this call moved to CONFIRMED.
    async fn confirm_cohort(
        &self,
        session_id: i32,
        seats: &[String],
        event: &ProcessedEvent,
    ) -> DomainResult<ConfirmOutcome>;

    /// Cancel PENDING bookings created before `cutoff`. Returns the number
    /// of rows changed.
    async fn expire_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}
