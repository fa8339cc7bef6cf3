//! Booking domain entity

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::catalog::UserBasic;
use crate::shared::{DomainError, DomainResult};

/// Booking status
///
/// `Pending -> Confirmed` happens only through a payment confirmation,
/// `Pending -> Canceled` through user cancellation or pending expiry.
/// Both `Confirmed` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Whether a booking in this status keeps the seat taken
    pub fn holds_seat(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed) | (Self::Pending, Self::Canceled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(DomainError::Internal(format!(
                "unknown booking status '{}'",
                other
            ))),
        }
    }
}

/// A claim on one seat of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: i32,
    pub session_id: i32,
    /// Seat code within the session's room
    pub place: String,
    pub status: BookingStatus,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Still holds its seat
    pub fn is_active(&self) -> bool {
        self.status.holds_seat()
    }
}

/// Validated reservation request.
///
/// Construction guarantees a non-empty list of distinct, non-blank seat codes
/// in the caller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBooking {
    session_id: i32,
    seats: Vec<String>,
}

impl CreateBooking {
    pub fn new(session_id: i32, seats: Vec<String>) -> DomainResult<Self> {
        if seats.is_empty() {
            return Err(DomainError::InvalidInput(
                "at least one seat is required".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(seats.len());
        for seat in &seats {
            if seat.trim().is_empty() {
                return Err(DomainError::InvalidInput(
                    "seat codes must not be blank".into(),
                ));
            }
            if !seen.insert(seat.as_str()) {
                return Err(DomainError::InvalidInput(format!(
                    "seat '{}' requested more than once",
                    seat
                )));
            }
        }

        Ok(Self { session_id, seats })
    }

    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    pub fn seats(&self) -> &[String] {
        &self.seats
    }
}

/// Returned to the caller after a successful reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationDraft {
    pub session_id: i32,
    pub seats: Vec<String>,
    pub price: i32,
}

/// Reserving user as shown in booking projections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingUser {
    pub id: i32,
    pub name: String,
}

/// Session fields joined into booking projections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSessionSummary {
    pub id: i32,
    pub price: i32,
    pub starts_at: DateTime<Utc>,
    pub cinema_id: Option<i32>,
    pub cinema_name: Option<String>,
    pub movie_title: Option<String>,
}

/// Read projection for Get / GetAll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetails {
    pub id: i32,
    pub place: String,
    pub status: BookingStatus,
    pub user: BookingUser,
    pub session: BookingSessionSummary,
}

/// Result of a cancellation request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled,
    /// The booking was already canceled; nothing changed
    AlreadyCanceled,
}

/// Rows touched by one cohort confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct CohortConfirmation {
    pub session_id: i32,
    /// Bookings moved from PENDING to CONFIRMED by this confirmation
    pub confirmed: Vec<Booking>,
    /// Requested seats that had no PENDING booking (already confirmed,
    /// canceled, expired or never booked)
    pub skipped_seats: Vec<String>,
}

impl CohortConfirmation {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    pub fn seats(&self) -> Vec<String> {
        self.confirmed.iter().map(|b| b.place.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(CohortConfirmation),
    /// The event id was recorded by an earlier delivery; nothing changed
    AlreadyProcessed,
}

/// Notification-time projection of a freshly confirmed cohort
#[derive(Debug, Clone, PartialEq)]
pub struct BookingCohort {
    pub session_id: i32,
    pub seats: Vec<String>,
    pub booking_user: UserBasic,
    pub owner: UserBasic,
    pub movie_title: Option<String>,
}

impl BookingCohort {
    /// Human readable line shown to the manager
    pub fn summary(&self) -> String {
        let film = self.movie_title.as_deref().unwrap_or("unknown film");
        format!(
            "User {} reserved seats [{}] for film: {}",
            self.booking_user.name,
            self.seats.join(", "),
            film
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────
