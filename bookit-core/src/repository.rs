use async_trait::async_trait;
use bookit_shared::{
    HotelId, Payment, PaymentMethod, Reservation, RoomId, RoomListing, RoomLock, UserId,
    UserIdentity,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Failure of a storage backend (database, cache).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn corrupt(err: impl std::fmt::Display) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Collaborators owned by the surrounding application
// ============================================================================

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserIdentity>>;
}

/// Read access to hotels and rooms.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_room(&self, id: RoomId) -> StoreResult<Option<RoomListing>>;

    /// Rooms of hotels whose location starts with `city` (case-insensitive),
    /// ordered by hotel, room type, price.
    async fn rooms_in_city(&self, city: &str) -> StoreResult<Vec<RoomListing>>;
}

// ============================================================================
// Lock ledger
// ============================================================================

#[derive(Debug, Clone)]
pub struct LockRequest {
    pub user_id: UserId,
    /// Deduplicated, in caller order.
    pub room_ids: Vec<RoomId>,
    pub now: DateTime<Utc>,
    pub locked_until: DateTime<Utc>,
    pub max_locks: usize,
}

/// Which of the requested rooms fit in the user's quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPlan {
    pub rooms: Vec<RoomId>,
    pub remaining_slots: usize,
}

impl LockRequest {
    /// `None` when the user is already at or above quota. Otherwise the first rooms that
    /// fit in `max_locks - active`; `remaining_slots` is what is left of those slots after
    /// the grant, not the number of rooms that were dropped.
    pub fn plan(&self, active: usize) -> Option<GrantPlan> {
        if active >= self.max_locks {
            return None;
        }
        let slots = self.max_locks - active;
        let rooms: Vec<RoomId> = self.room_ids.iter().copied().take(slots).collect();
        let remaining_slots = slots - rooms.len();
        Some(GrantPlan {
            rooms,
            remaining_slots,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Granted(GrantPlan),
    QuotaExceeded { active: usize },
    Conflict { room_ids: Vec<RoomId> },
    UnknownRooms { room_ids: Vec<RoomId> },
}

/// Durable `(user, room) -> locked_until` rows.
///
/// `acquire` must run as one atomic unit: room existence, quota count, conflict check,
/// removal of the user's previous locks and insertion of the new ones.
#[async_trait]
pub trait LockLedger: Send + Sync {
    async fn acquire(&self, request: &LockRequest) -> StoreResult<LockOutcome>;

    /// Deletes the user's rows for `room_ids`; returns how many were removed.
    async fn release(&self, user_id: UserId, room_ids: &[RoomId]) -> StoreResult<u64>;

    async fn live_locks(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<RoomLock>>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

// ============================================================================
// Reservations and payments
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub count_of_guests: u32,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub reservation: Reservation,
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(Booking),
    RoomMissing,
    LockMissing,
    /// `available_from` is the earliest check-out among the clashing reservations.
    DateConflict { available_from: Option<NaiveDate> },
}

/// A reservation joined with what a listing needs to show.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub payment: Option<Payment>,
    pub room_number: i32,
    pub hotel_id: HotelId,
    pub hotel_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotelScope {
    ManagedBy(UserId),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled(Reservation),
    NotFound,
    NotOwner,
    AlreadyCanceled,
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Atomically: verify the live lock, check for overlapping confirmed reservations,
    /// insert reservation + payment, delete the consumed lock.
    async fn commit(&self, request: &CommitRequest) -> StoreResult<CommitOutcome>;

    /// Rooms with a confirmed reservation overlapping `[check_in, check_out)`.
    async fn reserved_room_ids(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<HashSet<RoomId>>;

    /// Newest first.
    async fn reservations_for_customer(
        &self,
        customer_id: UserId,
    ) -> StoreResult<Vec<ReservationDetails>>;

    /// Newest first.
    async fn reservations_for_hotels(
        &self,
        scope: HotelScope,
    ) -> StoreResult<Vec<ReservationDetails>>;

    async fn cancel(&self, reservation_id: Uuid, customer_id: UserId)
        -> StoreResult<CancelOutcome>;
}

// ============================================================================
// Expiring key-value state
// ============================================================================

/// Keyed state that disappears on its own after a TTL.
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rooms: &[i64]) -> LockRequest {
        let now = Utc::now();
        LockRequest {
            user_id: UserId(1),
            room_ids: rooms.iter().map(|r| RoomId(*r)).collect(),
            now,
            locked_until: now,
            max_locks: 3,
        }
    }

    #[test]
    fn test_plan_fits_within_quota() {
        let plan = request(&[101, 102]).plan(0).unwrap();
        assert_eq!(plan.rooms, vec![RoomId(101), RoomId(102)]);
        assert_eq!(plan.remaining_slots, 1);
    }

    #[test]
    fn test_plan_truncates_and_reports_leftover_slots() {
        let plan = request(&[1, 2, 3, 4]).plan(1).unwrap();
        assert_eq!(plan.rooms, vec![RoomId(1), RoomId(2)]);
        assert_eq!(plan.remaining_slots, 0);
    }

    #[test]
    fn test_plan_rejects_at_quota() {
        assert!(request(&[1]).plan(3).is_none());
        assert!(request(&[1]).plan(4).is_none());
    }
}
