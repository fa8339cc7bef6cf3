//! Background task that periodically releases unpaid reservations.
//!
//! PENDING bookings older than the configured time-to-live are moved to
//! CANCELED so their seats become available again. The update only matches
//! PENDING rows, so a payment confirmation that commits first always wins.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::RepositoryProvider;
use crate::shared::{DomainResult, ShutdownSignal};

/// Start the pending expiry background task.
///
/// Does nothing when `pending_ttl_minutes` is 0.
pub fn start_pending_expiry_task(
    repos: Arc<dyn RepositoryProvider>,
    shutdown: ShutdownSignal,
    pending_ttl_minutes: u64,
    check_interval_secs: u64,
) -> Option<tokio::task::JoinHandle<()>> {
    if pending_ttl_minutes == 0 {
        info!("Pending expiry disabled");
        return None;
    }

    let handle = tokio::spawn(async move {
        info!(
            ttl_minutes = pending_ttl_minutes,
            check_interval = check_interval_secs,
            "Pending expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = expire_pending_bookings(repos.as_ref(), pending_ttl_minutes).await {
                        warn!(error = %e, "Pending expiry check error");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Pending expiry task shutting down");
                    break;
                }
            }
        }

        info!("Pending expiry task stopped");
    });
    Some(handle)
}

/// Cancel PENDING bookings older than `ttl_minutes`. Returns how many.
pub async fn expire_pending_bookings(
    repos: &dyn RepositoryProvider,
    ttl_minutes: u64,
) -> DomainResult<u64> {
    let cutoff = Utc::now() - chrono::Duration::minutes(ttl_minutes as i64);
    let expired = repos.bookings().expire_pending(cutoff).await?;

    if expired > 0 {
        info!(count = expired, %cutoff, "Expired unpaid reservations");
    } else {
        debug!(%cutoff, "No unpaid reservations to expire");
    }
    Ok(expired)
}
