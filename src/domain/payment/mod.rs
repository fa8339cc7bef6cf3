//! Payment provider events as seen by the booking core

pub mod model;
pub mod repository;

pub use model::{CheckoutMetadata, ProcessedEvent, CHECKOUT_COMPLETED};
pub use repository::ProcessedEventRepository;
