//! Payment provider callbacks

pub mod event;
pub mod processor;

pub use event::EventEnvelope;
pub use processor::{PaymentCallbackProcessor, WebhookOutcome, DEFAULT_MAX_PAYLOAD_BYTES};
