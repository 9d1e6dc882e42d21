use async_trait::async_trait;
use bookit_shared::BookingEvent;
use tracing::info;

use crate::repository::{StoreError, StoreResult};

/// Outbound notifications (confirmation mails, analytics) after a commit.
/// Callers log failures and carry on; a committed booking is never rolled back.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> StoreResult<()>;
}

/// Writes events to the tracing pipeline.
pub struct TracingNotifier;

#[async_trait]
impl BookingNotifier for TracingNotifier {
    async fn publish(&self, event: &BookingEvent) -> StoreResult<()> {
        let payload = serde_json::to_string(event).map_err(StoreError::backend)?;
        info!(target: "bookit::events", "{}", payload);
        Ok(())
    }
}
