use bookit_shared::UserId;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::repository::{ExpiringStore, StoreError, StoreResult};

/// Per-user lock cooldown kept in an [`ExpiringStore`], so it survives restarts and is
/// shared by every API instance.
#[derive(Clone)]
pub struct CooldownGate {
    store: Arc<dyn ExpiringStore>,
}

impl CooldownGate {
    pub fn new(store: Arc<dyn ExpiringStore>) -> Self {
        Self { store }
    }

    pub fn key(user_id: UserId) -> String {
        format!("lock_cooldown:{}", user_id)
    }

    /// The remembered expiry, if the user is still cooling down at `now`.
    pub async fn active_until(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(&Self::key(user_id)).await? else {
            return Ok(None);
        };
        let until = DateTime::parse_from_rfc3339(&raw)
            .map_err(StoreError::corrupt)?
            .with_timezone(&Utc);
        Ok((until > now).then_some(until))
    }

    pub async fn start(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<()> {
        let ttl = (until - now).to_std().map_err(StoreError::corrupt)?;
        self.store
            .set_with_ttl(&Self::key(user_id), &until.to_rfc3339(), ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryExpiringStore;
    use chrono::Duration;

    #[tokio::test]
    async fn test_cooldown_round_trip() {
        let gate = CooldownGate::new(Arc::new(InMemoryExpiringStore::new()));
        let user = UserId(7);
        let now = Utc::now();
        assert_eq!(gate.active_until(user, now).await.unwrap(), None);

        let until = now + Duration::minutes(5);
        gate.start(user, now, until).await.unwrap();

        let remembered = gate.active_until(user, now).await.unwrap().unwrap();
        assert_eq!(remembered.timestamp(), until.timestamp());
        // the stored timestamp itself gates the cooldown, independent of the TTL
        assert_eq!(gate.active_until(user, until + Duration::seconds(1)).await.unwrap(), None);
    }
}
