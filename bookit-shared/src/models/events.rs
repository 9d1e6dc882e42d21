use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PaymentMethod, RoomId, UserId};

/// Facts published after a booking state change has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    RoomsLocked {
        user_id: UserId,
        room_ids: Vec<RoomId>,
        locked_until: i64,
    },
    ReservationConfirmed {
        reservation_id: Uuid,
        room_id: RoomId,
        customer_id: UserId,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        amount_cents: i64,
        method: PaymentMethod,
        timestamp: i64,
    },
    ReservationCanceled {
        reservation_id: Uuid,
        customer_id: UserId,
        timestamp: i64,
    },
}
