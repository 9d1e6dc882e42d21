use async_trait::async_trait;
use bookit_core::repository::{
    Booking, CancelOutcome, CommitOutcome, CommitRequest, HotelScope, ReservationDetails,
    ReservationStore,
};
use bookit_core::{StoreError, StoreResult};
use bookit_shared::{
    HotelId, Payment, PaymentStatus, Reservation, ReservationStatus, RoomId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use crate::database::{backend, sql_state, EXCLUSION_VIOLATION};

/// Reservations and their payments. A commit locks the room row first, so concurrent
/// commits for one room run one after another; the `reservations_no_overlap` exclusion
/// constraint is the last line against double-booking.
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESERVATION_COLUMNS: &str =
    "id, room_id, customer_id, count_of_guests, check_in_date, check_out_date, status, created_at";

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    room_id: i64,
    customer_id: i64,
    count_of_guests: i32,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_reservation(self) -> StoreResult<Reservation> {
        Ok(Reservation {
            id: self.id,
            room_id: RoomId(self.room_id),
            customer_id: UserId(self.customer_id),
            count_of_guests: u32::try_from(self.count_of_guests).map_err(StoreError::corrupt)?,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            status: self.status.parse().map_err(StoreError::corrupt)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DetailsRow {
    #[sqlx(flatten)]
    reservation: ReservationRow,
    payment_id: Option<Uuid>,
    amount_cents: Option<i64>,
    method: Option<String>,
    payment_status: Option<String>,
    payment_created_at: Option<DateTime<Utc>>,
    room_number: i32,
    hotel_id: i64,
    hotel_name: String,
}

impl DetailsRow {
    fn into_details(self) -> StoreResult<ReservationDetails> {
        let reservation = self.reservation.into_reservation()?;
        let payment = match (
            self.payment_id,
            self.amount_cents,
            self.method,
            self.payment_status,
            self.payment_created_at,
        ) {
            (Some(id), Some(amount_cents), Some(method), Some(status), Some(created_at)) => {
                Some(Payment {
                    id,
                    reservation_id: reservation.id,
                    amount_cents,
                    method: method.parse().map_err(StoreError::corrupt)?,
                    status: status.parse().map_err(StoreError::corrupt)?,
                    created_at,
                })
            }
            _ => None,
        };
        Ok(ReservationDetails {
            reservation,
            payment,
            room_number: self.room_number,
            hotel_id: HotelId(self.hotel_id),
            hotel_name: self.hotel_name,
        })
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.room_id, r.customer_id, r.count_of_guests, r.check_in_date,
           r.check_out_date, r.status, r.created_at,
           p.id AS payment_id, p.amount_cents, p.method, p.status AS payment_status,
           p.created_at AS payment_created_at,
           rm.room_number, h.id AS hotel_id, h.name AS hotel_name
    FROM reservations r
    JOIN rooms rm ON rm.id = r.room_id
    JOIN hotels h ON h.id = rm.hotel_id
    LEFT JOIN payments p ON p.reservation_id = r.id
"#;

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn commit(&self, request: &CommitRequest) -> StoreResult<CommitOutcome> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let room: Option<i64> = sqlx::query_scalar("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(request.room_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        if room.is_none() {
            return Ok(CommitOutcome::RoomMissing);
        }

        let lock: Option<i64> = sqlx::query_scalar(
            "SELECT room_id FROM room_locks WHERE user_id = $1 AND room_id = $2 AND locked_until > $3",
        )
        .bind(request.user_id.0)
        .bind(request.room_id.0)
        .bind(request.now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;
        if lock.is_none() {
            return Ok(CommitOutcome::LockMissing);
        }

        let available_from: Option<NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT MIN(check_out_date) FROM reservations
            WHERE room_id = $1 AND status = 'confirmed'
              AND check_out_date > $2 AND check_in_date < $3
            "#,
        )
        .bind(request.room_id.0)
        .bind(request.check_in_date)
        .bind(request.check_out_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;
        if available_from.is_some() {
            return Ok(CommitOutcome::DateConflict { available_from });
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
        let guests = i32::try_from(reservation.count_of_guests).map_err(StoreError::corrupt)?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO reservations ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            RESERVATION_COLUMNS
        ))
        .bind(reservation.id)
        .bind(reservation.room_id.0)
        .bind(reservation.customer_id.0)
        .bind(guests)
        .bind(reservation.check_in_date)
        .bind(reservation.check_out_date)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await;
        if let Err(e) = inserted {
            if sql_state(&e).as_deref() == Some(EXCLUSION_VIOLATION) {
                warn!(room_id = %request.room_id, "overlapping stay rejected by constraint");
                return Ok(CommitOutcome::DateConflict {
                    available_from: None,
                });
            }
            return Err(backend(e));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            reservation_id: reservation.id,
            amount_cents: request.amount_cents,
            method: request.method,
            status: PaymentStatus::Confirmed,
            created_at: request.now,
        };
        sqlx::query(
            r#"
            INSERT INTO payments (id, reservation_id, amount_cents, method, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id)
        .bind(payment.reservation_id)
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query("DELETE FROM room_locks WHERE user_id = $1 AND room_id = $2")
            .bind(request.user_id.0)
            .bind(request.room_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

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
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT room_id FROM reservations
            WHERE status = 'confirmed' AND check_out_date > $1 AND check_in_date < $2
            "#,
        )
        .bind(check_in)
        .bind(check_out)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(ids.into_iter().map(RoomId).collect())
    }

    async fn reservations_for_customer(
        &self,
        customer_id: UserId,
    ) -> StoreResult<Vec<ReservationDetails>> {
        let sql = format!(
            "{} WHERE r.customer_id = $1 ORDER BY r.created_at DESC",
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(customer_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(DetailsRow::into_details).collect()
    }

    async fn reservations_for_hotels(
        &self,
        scope: HotelScope,
    ) -> StoreResult<Vec<ReservationDetails>> {
        let manager = match scope {
            HotelScope::ManagedBy(manager) => Some(manager.0),
            HotelScope::All => None,
        };
        let sql = format!(
            "{} WHERE ($1::BIGINT IS NULL OR h.manager_id = $1) ORDER BY r.created_at DESC",
            DETAILS_SELECT
        );
        let rows = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(manager)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(DetailsRow::into_details).collect()
    }

    async fn cancel(
        &self,
        reservation_id: Uuid,
        customer_id: UserId,
    ) -> StoreResult<CancelOutcome> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(CancelOutcome::NotFound);
        };
        let mut reservation = row.into_reservation()?;
        if reservation.customer_id != customer_id {
            return Ok(CancelOutcome::NotOwner);
        }
        if reservation.status == ReservationStatus::Canceled {
            return Ok(CancelOutcome::AlreadyCanceled);
        }

        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(reservation_id)
            .bind(ReservationStatus::Canceled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("UPDATE payments SET status = $2 WHERE reservation_id = $1")
            .bind(reservation_id)
            .bind(PaymentStatus::Canceled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        reservation.status = ReservationStatus::Canceled;
        Ok(CancelOutcome::Canceled(reservation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookit_shared::PaymentMethod;

    fn reservation_row(guests: i32, status: &str) -> ReservationRow {
        ReservationRow {
            id: Uuid::new_v4(),
            room_id: 101,
            customer_id: 1,
            count_of_guests: guests,
            check_in_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2030, 3, 3).unwrap(),
            status: status.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reservation_row_conversion() {
        let reservation = reservation_row(2, "confirmed").into_reservation().unwrap();
        assert_eq!(reservation.count_of_guests, 2);
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(reservation_row(-1, "confirmed").into_reservation().is_err());
        assert!(reservation_row(1, "pending").into_reservation().is_err());
    }

    #[test]
    fn test_details_without_payment() {
        let details = DetailsRow {
            reservation: reservation_row(1, "canceled"),
            payment_id: None,
            amount_cents: None,
            method: None,
            payment_status: None,
            payment_created_at: None,
            room_number: 12,
            hotel_id: 1,
            hotel_name: "Test Hotel".to_string(),
        }
        .into_details()
        .unwrap();
        assert!(details.payment.is_none());
        assert_eq!(details.reservation.status, ReservationStatus::Canceled);
    }

    #[test]
    fn test_details_with_payment() {
        let row = reservation_row(1, "confirmed");
        let id = row.id;
        let details = DetailsRow {
            reservation: row,
            payment_id: Some(Uuid::new_v4()),
            amount_cents: Some(6750),
            method: Some("In person".to_string()),
            payment_status: Some("confirmed".to_string()),
            payment_created_at: Some(Utc::now()),
            room_number: 12,
            hotel_id: 1,
            hotel_name: "Test Hotel".to_string(),
        }
        .into_details()
        .unwrap();
        let payment = details.payment.unwrap();
        assert_eq!(payment.reservation_id, id);
        assert_eq!(payment.method, PaymentMethod::InPerson);
        assert_eq!(payment.amount_cents, 6750);
    }
}
