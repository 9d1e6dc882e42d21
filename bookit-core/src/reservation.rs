use bookit_shared::{BookingEvent, PaymentMethod, Reservation, RoomId, UserId, UserRole};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dates::parse_stay;
use crate::notify::BookingNotifier;
use crate::pricing::quote_amount;
use crate::repository::{
    Booking, CancelOutcome, CommitOutcome, CommitRequest, HotelScope, InventoryStore,
    ReservationDetails, ReservationStore,
};
use crate::{CoreError, CoreResult};

/// Reserve input as received from a client; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReserveCommand {
    pub room_id: Option<RoomId>,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub method: Option<String>,
    pub count_of_guests: Option<u32>,
}

/// Turns a held lock into a confirmed reservation with its payment.
pub struct ReservationCommitter {
    inventory: Arc<dyn InventoryStore>,
    reservations: Arc<dyn ReservationStore>,
    notifier: Arc<dyn BookingNotifier>,
}

impl ReservationCommitter {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        reservations: Arc<dyn ReservationStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        Self {
            inventory,
            reservations,
            notifier,
        }
    }

    pub async fn reserve(&self, user_id: UserId, command: ReserveCommand) -> CoreResult<Booking> {
        self.reserve_at(user_id, command, Utc::now()).await
    }

    pub async fn reserve_at(
        &self,
        user_id: UserId,
        command: ReserveCommand,
        now: DateTime<Utc>,
    ) -> CoreResult<Booking> {
        let (Some(room_id), Some(check_in), Some(check_out), Some(method)) = (
            command.room_id,
            command.check_in_date.as_deref(),
            command.check_out_date.as_deref(),
            command.method.as_deref(),
        ) else {
            return Err(CoreError::bad_request("Missing required fields"));
        };

        let (check_in_date, check_out_date) = parse_stay(check_in, check_out)?;
        let method: PaymentMethod = method
            .parse()
            .map_err(|_| CoreError::bad_request("method must be 'In person' or 'online'"))?;

        let listing = self
            .inventory
            .find_room(room_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room not found"))?;

        let count_of_guests = command.count_of_guests.unwrap_or(1);
        if count_of_guests == 0 || count_of_guests > listing.room.capacity() {
            return Err(CoreError::bad_request(format!(
                "Room capacity exceeded. Maximum {} guests allowed.",
                listing.room.capacity()
            )));
        }

        let request = CommitRequest {
            user_id,
            room_id,
            check_in_date,
            check_out_date,
            count_of_guests,
            method,
            amount_cents: quote_amount(&listing, method, now),
            now,
        };

        let booking = match self.reservations.commit(&request).await? {
            CommitOutcome::Committed(booking) => booking,
            CommitOutcome::RoomMissing => return Err(CoreError::not_found("Room not found")),
            CommitOutcome::LockMissing => {
                warn!(user_id = %user_id, room_id = %room_id, "reserve without a live lock");
                return Err(CoreError::LockRequired);
            }
            CommitOutcome::DateConflict { available_from } => {
                info!(room_id = %room_id, ?available_from, "reserve clashes with existing stay");
                return Err(CoreError::DateConflict { available_from });
            }
        };

        info!(
            reservation_id = %booking.reservation.id,
            user_id = %user_id,
            room_id = %room_id,
            amount_cents = booking.payment.amount_cents,
            "reservation confirmed"
        );

        let event = BookingEvent::ReservationConfirmed {
            reservation_id: booking.reservation.id,
            room_id,
            customer_id: user_id,
            check_in_date,
            check_out_date,
            amount_cents: booking.payment.amount_cents,
            method,
            timestamp: now.timestamp(),
        };
        if let Err(e) = self.notifier.publish(&event).await {
            warn!(reservation_id = %booking.reservation.id, "confirmation not sent: {}", e);
        }

        Ok(booking)
    }

    pub async fn customer_reservations(&self, user_id: UserId) -> CoreResult<Vec<ReservationDetails>> {
        Ok(self.reservations.reservations_for_customer(user_id).await?)
    }

    /// Hotel managers see reservations on their own hotels, admins see all.
    pub async fn hotel_reservations(
        &self,
        user_id: UserId,
        role: UserRole,
    ) -> CoreResult<Vec<ReservationDetails>> {
        let scope = match role {
            UserRole::Admin => HotelScope::All,
            UserRole::HotelManager => HotelScope::ManagedBy(user_id),
            UserRole::Customer => {
                return Err(CoreError::Forbidden(
                    "Only hotel managers can list hotel reservations".to_string(),
                ))
            }
        };
        Ok(self.reservations.reservations_for_hotels(scope).await?)
    }

    pub async fn cancel(&self, user_id: UserId, reservation_id: Uuid) -> CoreResult<Reservation> {
        match self.reservations.cancel(reservation_id, user_id).await? {
            CancelOutcome::Canceled(reservation) => {
                info!(reservation_id = %reservation_id, user_id = %user_id, "reservation canceled");
                let event = BookingEvent::ReservationCanceled {
                    reservation_id,
                    customer_id: user_id,
                    timestamp: Utc::now().timestamp(),
                };
                if let Err(e) = self.notifier.publish(&event).await {
                    warn!(reservation_id = %reservation_id, "cancellation not sent: {}", e);
                }
                Ok(reservation)
            }
            CancelOutcome::NotFound => Err(CoreError::not_found("Reservation not found")),
            CancelOutcome::NotOwner => Err(CoreError::Forbidden(
                "You can only cancel your own reservations".to_string(),
            )),
            CancelOutcome::AlreadyCanceled => Err(CoreError::StateConflict(
                "Reservation already canceled".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStore, RecordingNotifier};
    use bookit_shared::{
        DiscountStatus, Hotel, HotelId, PaymentStatus, ReservationStatus, Room, RoomLock, RoomType,
    };
    use chrono::{Duration, NaiveDate};

    const CUSTOMER: UserId = UserId(1);
    const MANAGER: UserId = UserId(50);

    async fn fixture(notifier: Arc<RecordingNotifier>) -> (Arc<InMemoryStore>, ReservationCommitter) {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_hotel(Hotel {
                id: HotelId(1),
                manager_id: MANAGER,
                name: "Test Hotel".to_string(),
                location: "Test City, 123 Test St".to_string(),
                discount_percent: 10,
                discount_status: DiscountStatus::Active,
                discount_start_date: None,
                discount_end_date: Some(Utc::now() + Duration::days(30)),
            })
            .await;
        for (id, room_type) in [(101, RoomType::Double), (102, RoomType::Single)] {
            store
                .insert_room(Room {
                    id: RoomId(id),
                    hotel_id: HotelId(1),
                    room_number: id as i32,
                    name: "Deluxe Room".to_string(),
                    room_type,
                    price_cents: 15000,
                })
                .await;
        }
        let committer = ReservationCommitter::new(store.clone(), store.clone(), notifier);
        (store, committer)
    }

    async fn lock(store: &InMemoryStore, user_id: UserId, room: i64, minutes: i64) {
        store
            .insert_lock(RoomLock {
                user_id,
                room_id: RoomId(room),
                locked_until: Utc::now() + Duration::minutes(minutes),
            })
            .await;
    }

    fn command(room: i64, check_in: &str, check_out: &str, method: &str) -> ReserveCommand {
        ReserveCommand {
            room_id: Some(RoomId(room)),
            check_in_date: Some(check_in.to_string()),
            check_out_date: Some(check_out.to_string()),
            method: Some(method.to_string()),
            count_of_guests: None,
        }
    }

    #[tokio::test]
    async fn test_reserve_consumes_lock_and_prices_stay() {
        let notifier = Arc::new(RecordingNotifier::new());
        let (store, committer) = fixture(notifier.clone()).await;
        lock(&store, CUSTOMER, 101, 15).await;

        let booking = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "In person"))
            .await
            .unwrap();

        assert_eq!(booking.reservation.status, ReservationStatus::Confirmed);
        assert_eq!(booking.payment.status, PaymentStatus::Confirmed);
        assert_eq!(booking.payment.amount_cents, 6750);
        assert_eq!(booking.payment.reservation_id, booking.reservation.id);
        assert!(store.lock_rows().await.is_empty());
        assert_eq!(notifier.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reserve_without_lock() {
        let (_, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        let err = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LockRequired));
        assert_eq!(err.to_string(), "Room not locked or lock expired");
    }

    #[tokio::test]
    async fn test_reserve_with_expired_lock() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, CUSTOMER, 101, -1).await;
        let err = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LockRequired));
        assert!(store.reservation_rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_someone_elses_lock_does_not_count() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, UserId(2), 101, 15).await;
        let err = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::LockRequired));
    }

    #[tokio::test]
    async fn test_overlap_reports_earliest_free_date() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, CUSTOMER, 101, 15).await;
        for (check_in, check_out) in [("2030-03-02", "2030-03-05"), ("2030-03-01", "2030-03-04")] {
            store
                .insert_reservation(Reservation {
                    id: Uuid::new_v4(),
                    room_id: RoomId(101),
                    customer_id: UserId(3),
                    count_of_guests: 1,
                    check_in_date: NaiveDate::parse_from_str(check_in, "%Y-%m-%d").unwrap(),
                    check_out_date: NaiveDate::parse_from_str(check_out, "%Y-%m-%d").unwrap(),
                    status: ReservationStatus::Confirmed,
                    created_at: Utc::now(),
                })
                .await;
        }

        let err = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap_err();

        match err {
            CoreError::DateConflict { available_from } => {
                assert_eq!(available_from, NaiveDate::from_ymd_opt(2030, 3, 4));
            }
            other => panic!("expected date conflict, got {:?}", other),
        }
        // the lock survives a rejected commit
        assert_eq!(store.lock_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_canceled_stay_does_not_block() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, CUSTOMER, 101, 15).await;
        store
            .insert_reservation(Reservation {
                id: Uuid::new_v4(),
                room_id: RoomId(101),
                customer_id: UserId(3),
                count_of_guests: 1,
                check_in_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
                check_out_date: NaiveDate::from_ymd_opt(2030, 3, 3).unwrap(),
                status: ReservationStatus::Canceled,
                created_at: Utc::now(),
            })
            .await;

        assert!(committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_input_validation() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, CUSTOMER, 102, 15).await;

        let missing = ReserveCommand {
            room_id: Some(RoomId(101)),
            ..Default::default()
        };
        let err = committer.reserve(CUSTOMER, missing).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");

        let err = committer
            .reserve(CUSTOMER, command(999, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Room not found");

        for bad in [
            command(101, "2030-03-03", "2030-03-01", "online"),
            command(101, "tomorrow", "2030-03-01", "online"),
            command(101, "2030-03-01", "2030-03-03", "cash"),
        ] {
            assert!(matches!(committer.reserve(CUSTOMER, bad).await, Err(CoreError::BadRequest(_))));
        }

        let mut crowded = command(102, "2030-03-01", "2030-03-03", "online");
        crowded.count_of_guests = Some(2);
        assert!(matches!(committer.reserve(CUSTOMER, crowded).await, Err(CoreError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_booking() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::failing())).await;
        lock(&store, CUSTOMER, 101, 15).await;

        let booking = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap();

        assert_eq!(store.reservation_rows().await.len(), 1);
        assert!(store.payment_for(booking.reservation.id).await.is_some());
    }

    #[tokio::test]
    async fn test_listings_and_cancel() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        lock(&store, CUSTOMER, 101, 15).await;
        let booking = committer
            .reserve(CUSTOMER, command(101, "2030-03-01", "2030-03-03", "online"))
            .await
            .unwrap();

        let mine = committer.customer_reservations(CUSTOMER).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].hotel_name, "Test Hotel");
        assert_eq!(mine[0].payment.as_ref().unwrap().amount_cents, 13500);

        assert_eq!(committer.hotel_reservations(MANAGER, UserRole::HotelManager).await.unwrap().len(), 1);
        assert!(committer.hotel_reservations(UserId(51), UserRole::HotelManager).await.unwrap().is_empty());
        assert_eq!(committer.hotel_reservations(UserId(7), UserRole::Admin).await.unwrap().len(), 1);
        assert!(matches!(
            committer.hotel_reservations(CUSTOMER, UserRole::Customer).await,
            Err(CoreError::Forbidden(_))
        ));

        let id = booking.reservation.id;
        assert!(matches!(committer.cancel(UserId(2), id).await, Err(CoreError::Forbidden(_))));
        let canceled = committer.cancel(CUSTOMER, id).await.unwrap();
        assert_eq!(canceled.status, ReservationStatus::Canceled);
        assert_eq!(store.payment_for(id).await.unwrap().status, PaymentStatus::Canceled);
        assert!(matches!(committer.cancel(CUSTOMER, id).await, Err(CoreError::StateConflict(_))));
        assert!(matches!(committer.cancel(CUSTOMER, Uuid::new_v4()).await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserves_confirm_one_stay() {
        let (store, committer) = fixture(Arc::new(RecordingNotifier::new())).await;
        let guests: Vec<UserId> = (10..18).map(UserId).collect();
        for guest in &guests {
            lock(&store, *guest, 101, 15).await;
        }

        let committer = Arc::new(committer);
        let handles: Vec<_> = guests
            .iter()
            .enumerate()
            .map(|(i, guest)| {
                let committer = committer.clone();
                let guest = *guest;
                // Every stay overlaps 2030-03-02.
                let check_in = if i % 2 == 0 { "2030-03-01" } else { "2030-03-02" };
                tokio::spawn(async move {
                    committer
                        .reserve(guest, command(101, check_in, "2030-03-04", "online"))
                        .await
                })
            })
            .collect();

        let mut confirmed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => confirmed += 1,
                Err(CoreError::DateConflict { available_from }) => {
                    assert_eq!(available_from, NaiveDate::from_ymd_opt(2030, 3, 4));
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(confirmed, 1);
        let rows = store.reservation_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReservationStatus::Confirmed);
    }
}
