pub mod expiry;
pub mod service;

pub use expiry::{expire_pending_bookings, start_pending_expiry_task};
pub use service::BookingService;
