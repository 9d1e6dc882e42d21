//! In-process implementations of the store traits.
//!
//! Every table sits behind one mutex, so each trait call is atomic in the same way a
//! single database transaction would be. Used by the test-suites and for local runs
//! without Postgres/Redis.

use async_trait::async_trait;
use bookit_shared::{
    BookingEvent, Hotel, HotelId, Payment, PaymentStatus, Reservation, ReservationStatus, Room,
    RoomId, RoomListing, RoomLock, UserId, UserIdentity,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::notify::BookingNotifier;
use crate::repository::{
    Booking, CancelOutcome, CommitOutcome, CommitRequest, ExpiringStore, HotelScope,
    InventoryStore, LockLedger, LockOutcome, LockRequest, ReservationDetails, ReservationStore,
    StoreError, StoreResult, UserDirectory,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserIdentity>,
    hotels: BTreeMap<HotelId, Hotel>,
    rooms: BTreeMap<RoomId, Room>,
    locks: Vec<RoomLock>,
    reservations: Vec<Reservation>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn listing(&self, room: &Room) -> StoreResult<RoomListing> {
        let hotel = self
            .hotels
            .get(&room.hotel_id)
            .ok_or_else(|| StoreError::corrupt(format!("room {} has no hotel", room.id)))?;
        Ok(RoomListing {
            room: room.clone(),
            hotel: hotel.clone(),
        })
    }

    fn details(&self, reservation: &Reservation) -> StoreResult<ReservationDetails> {
        let room = self.rooms.get(&reservation.room_id).ok_or_else(|| {
            StoreError::corrupt(format!("reservation {} has no room", reservation.id))
        })?;
        let listing = self.listing(room)?;
        Ok(ReservationDetails {
            reservation: reservation.clone(),
            payment: self.payments.get(&reservation.id).cloned(),
            room_number: room.room_number,
            hotel_id: listing.hotel.id,
            hotel_name: listing.hotel.name,
        })
    }

    fn newest_first<'a>(
        &self,
        reservations: impl Iterator<Item = &'a Reservation>,
    ) -> StoreResult<Vec<ReservationDetails>> {
        let mut rows = reservations
            .map(|r| self.details(r))
            .collect::<StoreResult<Vec<_>>>()?;
        rows.sort_by(|a, b| b.reservation.created_at.cmp(&a.reservation.created_at));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserIdentity) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_hotel(&self, hotel: Hotel) {
        self.tables.lock().await.hotels.insert(hotel.id, hotel);
    }

    pub async fn insert_room(&self, room: Room) {
        self.tables.lock().await.rooms.insert(room.id, room);
    }

    /// Writes a ledger row as-is, bypassing quota and conflict checks.
    pub async fn insert_lock(&self, lock: RoomLock) {
        let mut tables = self.tables.lock().await;
        tables
            .locks
            .retain(|l| !(l.user_id == lock.user_id && l.room_id == lock.room_id));
        tables.locks.push(lock);
    }

    /// Writes a reservation as-is, bypassing lock and overlap checks.
    pub async fn insert_reservation(&self, reservation: Reservation) {
        self.tables.lock().await.reservations.push(reservation);
    }

    pub async fn lock_rows(&self) -> Vec<RoomLock> {
        self.tables.lock().await.locks.clone()
    }

    pub async fn reservation_rows(&self) -> Vec<Reservation> {
        self.tables.lock().await.reservations.clone()
    }

    pub async fn payment_for(&self, reservation_id: Uuid) -> Option<Payment> {
        self.tables.lock().await.payments.get(&reservation_id).cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserIdentity>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn find_room(&self, id: RoomId) -> StoreResult<Option<RoomListing>> {
        let tables = self.tables.lock().await;
        match tables.rooms.get(&id) {
            Some(room) => tables.listing(room).map(Some),
            None => Ok(None),
        }
    }

    async fn rooms_in_city(&self, city: &str) -> StoreResult<Vec<RoomListing>> {
        let tables = self.tables.lock().await;
        let prefix = city.to_lowercase();
        let mut listings = Vec::new();
        for room in tables.rooms.values() {
            let listing = tables.listing(room)?;
            if listing.hotel.location.to_lowercase().starts_with(&prefix) {
                listings.push(listing);
            }
        }
        listings.sort_by(|a, b| {
            (a.room.hotel_id, a.room.room_type.as_str(), a.room.price_cents, a.room.id).cmp(&(
                b.room.hotel_id,
                b.room.room_type.as_str(),
                b.room.price_cents,
                b.room.id,
            ))
        });
        Ok(listings)
    }
}

#[async_trait]
impl LockLedger for InMemoryStore {
    async fn acquire(&self, request: &LockRequest) -> StoreResult<LockOutcome> {
        let mut tables = self.tables.lock().await;

        let unknown: Vec<RoomId> = request
            .room_ids
            .iter()
            .filter(|id| !tables.rooms.contains_key(*id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Ok(LockOutcome::UnknownRooms { room_ids: unknown });
        }

        let active = tables
            .locks
            .iter()
            .filter(|l| l.user_id == request.user_id && l.is_live(request.now))
            .count();
        let Some(plan) = request.plan(active) else {
            return Ok(LockOutcome::QuotaExceeded { active });
        };

        let conflicts: Vec<RoomId> = request
            .room_ids
            .iter()
            .filter(|id| {
                tables
                    .locks
                    .iter()
                    .any(|l| l.room_id == **id && l.is_live(request.now))
            })
            .copied()
            .collect();
        if !conflicts.is_empty() {
            return Ok(LockOutcome::Conflict { room_ids: conflicts });
        }

        let user_id = request.user_id;
        let now = request.now;
        tables
            .locks
            .retain(|l| l.user_id != user_id && !(request.room_ids.contains(&l.room_id) && !l.is_live(now)));
        for room_id in &plan.rooms {
            tables.locks.push(RoomLock {
                user_id,
                room_id: *room_id,
                locked_until: request.locked_until,
            });
        }
        Ok(LockOutcome::Granted(plan))
    }

    async fn release(&self, user_id: UserId, room_ids: &[RoomId]) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.locks.len();
        tables
            .locks
            .retain(|l| !(l.user_id == user_id && room_ids.contains(&l.room_id)));
        Ok((before - tables.locks.len()) as u64)
    }

    async fn live_locks(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<Vec<RoomLock>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .locks
            .iter()
            .filter(|l| l.user_id == user_id && l.is_live(now))
            .cloned()
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.locks.len();
        tables.locks.retain(|l| l.is_live(now));
        Ok((before - tables.locks.len()) as u64)
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn commit(&self, request: &CommitRequest) -> StoreResult<CommitOutcome> {
        let mut tables = self.tables.lock().await;

        if !tables.rooms.contains_key(&request.room_id) {
            return Ok(CommitOutcome::RoomMissing);
        }

        let holds_lock = tables.locks.iter().any(|l| {
            l.user_id == request.user_id && l.room_id == request.room_id && l.is_live(request.now)
        });
        if !holds_lock {
            return Ok(CommitOutcome::LockMissing);
        }

        let clash: Option<NaiveDate> = tables
            .reservations
            .iter()
            .filter(|r| {
                r.room_id == request.room_id
                    && r.blocks(request.check_in_date, request.check_out_date)
            })
            .map(|r| r.check_out_date)
            .min();
        if let Some(available_from) = clash {
            return Ok(CommitOutcome::DateConflict {
                available_from: Some(available_from),
            });
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            room_id: request.room_id,
            customer_id: request.user_id,
            count_of_guests: request.count_of_guests,
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            status: ReservationStatus::Confirmed,
            created_at: request.now,
        };
        let payment = Payment {
            id: Uuid::new_v4(),
            reservation_id: reservation.id,
            amount_cents: request.amount_cents,
            method: request.method,
            status: PaymentStatus::Confirmed,
            created_at: request.now,
        };

        tables.reservations.push(reservation.clone());
        tables.payments.insert(reservation.id, payment.clone());
        tables
            .locks
            .retain(|l| !(l.user_id == request.user_id && l.room_id == request.room_id));

        Ok(CommitOutcome::Committed(Booking {
            reservation,
            payment,
        }))
    }

    async fn reserved_room_ids(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<HashSet<RoomId>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .iter()
            .filter(|r| r.blocks(check_in, check_out))
            .map(|r| r.room_id)
            .collect())
    }

    async fn reservations_for_customer(
        &self,
        customer_id: UserId,
    ) -> StoreResult<Vec<ReservationDetails>> {
        let tables = self.tables.lock().await;
        tables.newest_first(
            tables
                .reservations
                .iter()
                .filter(|r| r.customer_id == customer_id),
        )
    }

    async fn reservations_for_hotels(
        &self,
        scope: HotelScope,
    ) -> StoreResult<Vec<ReservationDetails>> {
        let tables = self.tables.lock().await;
        let in_scope = |r: &&Reservation| match scope {
            HotelScope::All => true,
            HotelScope::ManagedBy(manager) => tables
                .rooms
                .get(&r.room_id)
                .and_then(|room| tables.hotels.get(&room.hotel_id))
                .map_or(false, |hotel| hotel.manager_id == manager),
        };
        tables.newest_first(tables.reservations.iter().filter(in_scope))
    }

    async fn cancel(
        &self,
        reservation_id: Uuid,
        customer_id: UserId,
    ) -> StoreResult<CancelOutcome> {
        let mut tables = self.tables.lock().await;
        let Some(reservation) = tables
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
        else {
            return Ok(CancelOutcome::NotFound);
        };
        if reservation.customer_id != customer_id {
            return Ok(CancelOutcome::NotOwner);
        }
        if reservation.status == ReservationStatus::Canceled {
            return Ok(CancelOutcome::AlreadyCanceled);
        }
        reservation.status = ReservationStatus::Canceled;
        let canceled = reservation.clone();
        if let Some(payment) = tables.payments.get_mut(&reservation_id) {
            payment.status = PaymentStatus::Canceled;
        }
        Ok(CancelOutcome::Canceled(canceled))
    }
}

/// TTL map standing in for Redis.
#[derive(Default)]
pub struct InMemoryExpiringStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryExpiringStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpiringStore for InMemoryExpiringStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// Keeps every published event; can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BookingEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            fail: true,
        }
    }

    pub async fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn publish(&self, event: &BookingEvent) -> StoreResult<()> {
        if self.fail {
            return Err(StoreError::backend("notification channel unavailable"));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
