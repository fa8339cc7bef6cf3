//! Booking DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::booking::{BookingDetails, ReservationDraft};
use crate::shared::{PaginatedResult, PaginationParams};

/// Seats to reserve in one session
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[schema(example = 5)]
    pub session_id: i32,
    /// Seat codes, in the order they should be reserved
    #[validate(length(min = 1, max = 50, message = "between 1 and 50 seats per reservation"))]
    #[schema(example = json!(["A1", "A2"]))]
    pub seats: Vec<String>,
}

/// Returned after a successful reservation; pay `price` per seat
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationDraftDto {
    pub session_id: i32,
    pub seats: Vec<String>,
    /// Price per seat in minor currency units
    pub price: i32,
}

impl From<ReservationDraft> for ReservationDraftDto {
    fn from(d: ReservationDraft) -> Self {
        Self {
            session_id: d.session_id,
            seats: d.seats,
            price: d.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingUserDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingSessionDto {
    pub id: i32,
    pub price: i32,
    pub starts_at: String,
    pub cinema_id: Option<i32>,
    pub cinema_name: Option<String>,
    pub movie_title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: i32,
    pub place: String,
    /// PENDING, CONFIRMED or CANCELED
    pub status: String,
    pub user: BookingUserDto,
    pub session: BookingSessionDto,
}

impl From<BookingDetails> for BookingDto {
    fn from(b: BookingDetails) -> Self {
        Self {
            id: b.id,
            place: b.place,
            status: b.status.as_str().to_string(),
            user: BookingUserDto {
                id: b.user.id,
                name: b.user.name,
            },
            session: BookingSessionDto {
                id: b.session.id,
                price: b.session.price,
                starts_at: b.session.starts_at.to_rfc3339(),
                cinema_id: b.session.cinema_id,
                cinema_name: b.session.cinema_name,
                movie_title: b.session.movie_title,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingPage {
    pub items: Vec<BookingDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl From<PaginatedResult<BookingDetails>> for BookingPage {
    fn from(p: PaginatedResult<BookingDetails>) -> Self {
        Self {
            items: p.items.into_iter().map(BookingDto::from).collect(),
            total: p.total,
            page: p.page,
            limit: p.limit,
            total_pages: p.total_pages,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListBookingsParams {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Page size (1-100, default 10)
    pub limit: Option<u64>,
    /// Matches seat code, cinema name or movie title; a number also matches the session id
    pub search: Option<String>,
}

impl ListBookingsParams {
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}
