use bookit_shared::{BookingEvent, RoomId, RoomLock, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cooldown::CooldownGate;
use crate::notify::BookingNotifier;
use crate::repository::{LockLedger, LockOutcome, LockRequest, UserDirectory};
use crate::{CoreError, CoreResult};

/// Quota and timing rules for room locks.
#[derive(Debug, Clone)]
pub struct LockPolicy {
    pub max_locks_per_user: usize,
    pub lock_timeout: Duration,
    pub cooldown: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_locks_per_user: 3,
            lock_timeout: Duration::minutes(15),
            cooldown: Duration::minutes(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    pub locked_until: DateTime<Utc>,
    pub locked_rooms: Vec<RoomId>,
    pub remaining_slots: usize,
}

/// Owns the lifecycle of [`RoomLock`] rows: quota, cooldown, conflicts.
pub struct LockManager {
    ledger: Arc<dyn LockLedger>,
    users: Arc<dyn UserDirectory>,
    cooldowns: CooldownGate,
    notifier: Arc<dyn BookingNotifier>,
    policy: LockPolicy,
}

impl LockManager {
    pub fn new(
        ledger: Arc<dyn LockLedger>,
        users: Arc<dyn UserDirectory>,
        cooldowns: CooldownGate,
        notifier: Arc<dyn BookingNotifier>,
        policy: LockPolicy,
    ) -> Self {
        Self {
            ledger,
            users,
            cooldowns,
            notifier,
            policy,
        }
    }

    pub async fn acquire_locks(&self, user_id: UserId, room_ids: &[RoomId]) -> CoreResult<LockGrant> {
        self.acquire_locks_at(user_id, room_ids, Utc::now()).await
    }

    /// Replaces the user's current lock set with (a quota-truncated prefix of) `room_ids`.
    ///
    /// The whole batch is rejected if any requested room carries a live lock, whoever owns it.
    pub async fn acquire_locks_at(
        &self,
        user_id: UserId,
        room_ids: &[RoomId],
        now: DateTime<Utc>,
    ) -> CoreResult<LockGrant> {
        if room_ids.is_empty() {
            return Err(CoreError::bad_request("room_ids must not be empty"));
        }

        // A cooling-down user is turned away before the ledger is consulted.
        if let Some(until) = self.cooldowns.active_until(user_id, now).await? {
            warn!(user_id = %user_id, %until, "lock attempt during cooldown");
            return Err(CoreError::CoolingDown { until });
        }

        self.ensure_user(user_id).await?;

        let mut unique = Vec::with_capacity(room_ids.len());
        for id in room_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let locked_until = now + self.policy.lock_timeout;
        let request = LockRequest {
            user_id,
            room_ids: unique,
            now,
            locked_until,
            max_locks: self.policy.max_locks_per_user,
        };

        match self.ledger.acquire(&request).await? {
            LockOutcome::Granted(plan) => {
                info!(
                    user_id = %user_id,
                    rooms = ?plan.rooms,
                    remaining = plan.remaining_slots,
                    "rooms locked"
                );
                let event = BookingEvent::RoomsLocked {
                    user_id,
                    room_ids: plan.rooms.clone(),
                    locked_until: locked_until.timestamp(),
                };
                if let Err(e) = self.notifier.publish(&event).await {
                    warn!("failed to publish lock event: {}", e);
                }
                Ok(LockGrant {
                    locked_until,
                    locked_rooms: plan.rooms,
                    remaining_slots: plan.remaining_slots,
                })
            }
            LockOutcome::QuotaExceeded { active } => {
                let until = now + self.policy.cooldown;
                self.cooldowns.start(user_id, now, until).await?;
                warn!(user_id = %user_id, active, %until, "lock quota exceeded, cooldown started");
                Err(CoreError::QuotaExceeded { until })
            }
            LockOutcome::Conflict { room_ids } => {
                info!(user_id = %user_id, conflicts = ?room_ids, "lock request conflicts");
                Err(CoreError::LockConflict { room_ids })
            }
            LockOutcome::UnknownRooms { room_ids } => Err(CoreError::not_found(format!(
                "Room not found: {}",
                join_ids(&room_ids)
            ))),
        }
    }

    /// Removes the caller's locks on `room_ids`. Rooms without a lock count as zero.
    pub async fn release_locks(&self, user_id: UserId, room_ids: &[RoomId]) -> CoreResult<u64> {
        if room_ids.is_empty() {
            return Err(CoreError::bad_request("room_ids must not be empty"));
        }
        self.ensure_user(user_id).await?;

        let unlocked = self.ledger.release(user_id, room_ids).await?;
        info!(user_id = %user_id, unlocked, "rooms unlocked");
        Ok(unlocked)
    }

    pub async fn live_locks(&self, user_id: UserId) -> CoreResult<Vec<RoomLock>> {
        Ok(self.ledger.live_locks(user_id, Utc::now()).await?)
    }

    /// Deletes every expired ledger row. Lock checks never rely on this having run.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        Ok(self.ledger.purge_expired(now).await?)
    }

    async fn ensure_user(&self, user_id: UserId) -> CoreResult<()> {
        match self.users.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("User not found")),
        }
    }
}

fn join_ids(ids: &[RoomId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
