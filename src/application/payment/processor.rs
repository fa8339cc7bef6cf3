//! Payment callback processing
//!
//! Verifies and applies `checkout.session.completed` events: the matching
//! PENDING bookings are confirmed together with recording the event id,
//! then the cinema's manager is told about it. Redelivered events are
//! acknowledged without side effects.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::event::EventEnvelope;
use crate::application::notifications::{ManagerMessage, ManagerRegistry, NotifyOutcome};
use crate::domain::booking::{BookingCohort, CohortConfirmation, ConfirmOutcome};
use crate::domain::payment::{ProcessedEvent, CHECKOUT_COMPLETED};
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::WebhookVerifier;
use crate::shared::{DomainError, DomainResult};

/// Upper bound on accepted webhook bodies
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 65_536;

/// Successful handling of one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed {
        session_id: i32,
        seats: Vec<String>,
        /// `None` when the cohort could not be resolved for notification
        notified: Option<NotifyOutcome>,
    },
    /// The event id was applied by an earlier delivery
    Duplicate,
    /// Not an event type this service acts on
    Ignored,
    /// No PENDING booking matched the checkout metadata
    NoMatchingBookings,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::NoMatchingBookings => "no_matching_bookings",
        }
    }
}

pub struct PaymentCallbackProcessor {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<ManagerRegistry>,
    verifier: WebhookVerifier,
    max_payload_bytes: usize,
}

impl PaymentCallbackProcessor {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<ManagerRegistry>,
        verifier: WebhookVerifier,
        max_payload_bytes: usize,
    ) -> Self {
        Self {
            repos,
            registry,
            verifier,
            max_payload_bytes,
        }
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Handle one webhook delivery. Errors leave storage untouched.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> DomainResult<WebhookOutcome> {
        let result = self.process(payload, signature).await;
        let outcome = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(DomainError::InvalidSignature(_)) => "invalid_signature",
            Err(DomainError::InvalidPayload(_)) => "invalid_payload",
            Err(DomainError::PayloadTooLarge { .. }) => "payload_too_large",
            Err(_) => "error",
        };
        metrics::counter!("webhook_events_total", "outcome" => outcome).increment(1);
        result
    }

    async fn process(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> DomainResult<WebhookOutcome> {
        if payload.len() > self.max_payload_bytes {
            warn!(size = payload.len(), limit = self.max_payload_bytes, "Webhook body too large");
            return Err(DomainError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        if let Err(e) = self.verifier.verify(payload, signature) {
            warn!(error = %e, "Webhook signature verification failed");
            return Err(DomainError::InvalidSignature(e.to_string()));
        }

        let envelope = EventEnvelope::parse(payload)?;
        if envelope.event_type != CHECKOUT_COMPLETED {
            debug!(event_id = %envelope.id, event_type = %envelope.event_type, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        if self.repos.processed_events().is_processed(&envelope.id).await? {
            info!(event_id = %envelope.id, "Duplicate webhook delivery, already processed");
            return Ok(WebhookOutcome::Duplicate);
        }

        let metadata = envelope.checkout_metadata().map_err(|e| {
            warn!(event_id = %envelope.id, error = %e, "Checkout metadata rejected");
            e
        })?;

        let processed = ProcessedEvent::new(envelope.id.clone(), envelope.event_type.clone());
        let confirmation = match self
            .repos
            .bookings()
            .confirm_cohort(metadata.session_id, &metadata.seats, &processed)
            .await?
        {
            ConfirmOutcome::AlreadyProcessed => {
                info!(event_id = %envelope.id, "Webhook event recorded concurrently, skipping");
                return Ok(WebhookOutcome::Duplicate);
            }
            ConfirmOutcome::Confirmed(confirmation) => confirmation,
        };

        if !confirmation.skipped_seats.is_empty() {
            warn!(
                event_id = %envelope.id,
                session_id = metadata.session_id,
                seats = ?confirmation.skipped_seats,
                "Paid seats had no pending booking"
            );
        }

        if confirmation.is_empty() {
            warn!(
                event_id = %envelope.id,
                session_id = metadata.session_id,
                "Checkout completed but no booking was confirmed"
            );
            return Ok(WebhookOutcome::NoMatchingBookings);
        }

        let seats = confirmation.seats();
        info!(
            event_id = %envelope.id,
            session_id = confirmation.session_id,
            seats = ?seats,
            "Bookings confirmed"
        );

        let notified = self.notify_manager(&confirmation).await;

        Ok(WebhookOutcome::Confirmed {
            session_id: confirmation.session_id,
            seats,
            notified,
        })
    }

    /// Resolve the cohort and push it to the cinema owner. Never fails the
    /// callback: the bookings are already confirmed.
    async fn notify_manager(&self, confirmation: &CohortConfirmation) -> Option<NotifyOutcome> {
        match self.resolve_cohort(confirmation).await {
            Ok(Some(cohort)) => {
                let owner_id = cohort.owner.id;
                let outcome = self
                    .registry
                    .notify(owner_id, ManagerMessage::booking_confirmed(&cohort));
                info!(
                    manager_id = owner_id,
                    session_id = cohort.session_id,
                    outcome = outcome.as_str(),
                    "{}",
                    cohort.summary()
                );
                Some(outcome)
            }
            Ok(None) => {
                warn!(
                    session_id = confirmation.session_id,
                    "Cohort could not be resolved, manager not notified"
                );
                None
            }
            Err(e) => {
                error!(
                    session_id = confirmation.session_id,
                    error = %e,
                    "Cohort lookup failed, manager not notified"
                );
                None
            }
        }
    }

    async fn resolve_cohort(
        &self,
        confirmation: &CohortConfirmation,
    ) -> DomainResult<Option<BookingCohort>> {
        let Some(first) = confirmation.confirmed.first() else {
            return Ok(None);
        };
        if confirmation
            .confirmed
            .iter()
            .any(|b| b.user_id != first.user_id)
        {
            warn!(
                session_id = confirmation.session_id,
                "Confirmed seats belong to several users, reporting the first"
            );
        }

        let Some(session) = self.repos.sessions().find_session(confirmation.session_id).await?
        else {
            return Ok(None);
        };
        let Some(booking_user) = self.repos.users().find_user(first.user_id).await? else {
            return Ok(None);
        };
        let Some(owner) = self.repos.owners().find_cinema_owner(session.cinema_id).await? else {
            return Ok(None);
        };

        Ok(Some(BookingCohort {
            session_id: confirmation.session_id,
            seats: confirmation.seats(),
            booking_user,
            owner,
            movie_title: session.movie_title,
        }))
    }
}
