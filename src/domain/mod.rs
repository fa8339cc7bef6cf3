pub mod booking;
pub mod catalog;
pub mod identity;
pub mod payment;
pub mod repositories;

// Re-export commonly used types
pub use booking::{Booking, BookingStatus};
pub use identity::{Identity, UserRole};
pub use repositories::RepositoryProvider;

pub use crate::shared::errors::{DomainError, DomainResult};
