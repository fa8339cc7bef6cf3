use chrono::{DateTime, Utc};

/// The only provider event type that drives a state change
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Ledger entry for a provider event that has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedEvent {
    pub fn new(event_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
        }
    }
}

/// Booking reference carried in a completed checkout's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub session_id: i32,
    pub seats: Vec<String>,
}
