//! Booking service: seat reservation, cancellation and read projections

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::booking::{
    BookingDetails, BookingStatus, CancelOutcome, CreateBooking, ReservationDraft,
};
use crate::domain::{Identity, RepositoryProvider};
use crate::shared::{DomainError, DomainResult, PaginatedResult, PaginationParams};

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
}

impl BookingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Reserve every requested seat as PENDING for the caller, or none.
    pub async fn create(
        &self,
        identity: &Identity,
        request: CreateBooking,
    ) -> DomainResult<ReservationDraft> {
        let session_id = request.session_id();
        let session = self
            .repos
            .sessions()
            .find_session(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        let created = match self
            .repos
            .bookings()
            .create_pending(session_id, identity.user_id, request.seats())
            .await
        {
            Ok(created) => created,
            Err(DomainError::SeatConflict(taken)) => {
                metrics::counter!("booking_conflicts_total").increment(1);
                info!(
                    session_id,
                    user_id = identity.user_id,
                    seats = ?taken,
                    "Reservation rejected, seats already held"
                );
                return Err(DomainError::SeatConflict(taken));
            }
            Err(e) => return Err(e),
        };

        metrics::counter!("bookings_created_total").increment(created.len() as u64);
        info!(
            session_id,
            user_id = identity.user_id,
            seats = ?request.seats(),
            "Seats reserved"
        );

        Ok(ReservationDraft {
            session_id,
            seats: request.seats().to_vec(),
            price: session.price,
        })
    }

    /// Cancel a PENDING booking owned by the caller (or any, for admins).
    pub async fn cancel(&self, identity: &Identity, booking_id: i32) -> DomainResult<CancelOutcome> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::booking_not_found(booking_id))?;

        if !identity.can_act_for(booking.user_id) {
            return Err(DomainError::Forbidden(format!(
                "booking {} belongs to another user",
                booking_id
            )));
        }

        if booking.status == BookingStatus::Canceled {
            return Ok(CancelOutcome::AlreadyCanceled);
        }
        if !booking.status.can_transition_to(BookingStatus::Canceled) {
            return Err(confirmed_conflict(booking_id));
        }

        if self.repos.bookings().cancel_pending(booking_id).await? {
            info!(booking_id, user_id = identity.user_id, "Booking canceled");
            return Ok(CancelOutcome::Canceled);
        }

        // The row left PENDING between the read and the update.
        let current = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::booking_not_found(booking_id))?;
        match current.status {
            BookingStatus::Canceled => Ok(CancelOutcome::AlreadyCanceled),
            _ => {
                warn!(booking_id, "Cancellation lost race with payment confirmation");
                Err(confirmed_conflict(booking_id))
            }
        }
    }

    pub async fn get(&self, booking_id: i32) -> DomainResult<BookingDetails> {
        self.repos
            .bookings()
            .find_details(booking_id)
            .await?
            .ok_or_else(|| DomainError::booking_not_found(booking_id))
    }

    pub async fn get_all(
        &self,
        pagination: PaginationParams,
        search: Option<&str>,
    ) -> DomainResult<PaginatedResult<BookingDetails>> {
        self.repos
            .bookings()
            .list_details(pagination.normalized(), search)
            .await
    }
}

fn confirmed_conflict(booking_id: i32) -> DomainError {
    DomainError::Conflict(format!(
        "booking {} is already paid and cannot be canceled",
        booking_id
    ))
}
