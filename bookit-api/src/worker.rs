use std::sync::Arc;
use std::time::Duration;

use bookit_core::locks::LockManager;
use chrono::Utc;
use tracing::{debug, error, info};

/// Deletes expired lock rows on a fixed period. Lock checks compare `locked_until` on their
/// own, so a slow or stopped sweeper only leaves stale rows behind.
pub async fn start_lock_sweeper(locks: Arc<LockManager>, period: Duration) {
    info!("Lock sweeper started, running every {:?}", period);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&locks).await;
    }
}

pub async fn sweep_once(locks: &LockManager) -> u64 {
    match locks.purge_expired(Utc::now()).await {
        Ok(0) => 0,
        Ok(purged) => {
            debug!("Purged {} expired room locks", purged);
            purged
        }
        Err(e) => {
            error!("Lock sweep failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookit_core::cooldown::CooldownGate;
    use bookit_core::locks::LockPolicy;
    use bookit_core::memory::{InMemoryExpiringStore, InMemoryStore, RecordingNotifier};
    use bookit_shared::{RoomId, RoomLock, UserId};

    #[tokio::test]
    async fn test_sweep_removes_only_expired_rows() {
        let store = Arc::new(InMemoryStore::new());
        for (room, minutes) in [(101, -5), (102, 10)] {
            store
                .insert_lock(RoomLock {
                    user_id: UserId(1),
                    room_id: RoomId(room),
                    locked_until: Utc::now() + chrono::Duration::minutes(minutes),
                })
                .await;
        }
        let locks = LockManager::new(
            store.clone(),
            store.clone(),
            CooldownGate::new(Arc::new(InMemoryExpiringStore::new())),
            Arc::new(RecordingNotifier::new()),
            LockPolicy::default(),
        );

        assert_eq!(sweep_once(&locks).await, 1);
        assert_eq!(sweep_once(&locks).await, 0);
        let remaining = store.lock_rows().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].room_id, RoomId(102));
    }
}
