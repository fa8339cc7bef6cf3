//! Application layer - use cases over the domain

pub mod booking;
pub mod notifications;
pub mod payment;

pub use booking::{start_pending_expiry_task, BookingService};
pub use notifications::{
    create_manager_registry, ManagerMessage, ManagerRegistry, NotifyOutcome, SharedManagerRegistry,
};
pub use payment::{PaymentCallbackProcessor, WebhookOutcome};
