//! Booking aggregate
//!
//! Contains the Booking entity, its status machine, read projections
//! and the repository interface.

pub mod model;
pub mod repository;

pub use model::{
    Booking, BookingCohort, BookingDetails, BookingSessionSummary, BookingStatus, BookingUser,
    CancelOutcome, CohortConfirmation, ConfirmOutcome, CreateBooking, ReservationDraft,
};
pub use repository::BookingRepository;
