use async_trait::async_trait;

use super::model::ProcessedEvent;
use crate::shared::DomainResult;

#[async_trait]
pub trait ProcessedEventRepository: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> DomainResult<bool>;

    /// Record an event on its own. Returns `false` if it was already recorded.
    async fn record(&self, event: &ProcessedEvent) -> DomainResult<bool>;
}
