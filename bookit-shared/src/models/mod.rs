pub mod booking;
pub mod events;
pub mod inventory;
pub mod user;

pub use booking::{Payment, PaymentMethod, PaymentStatus, Reservation, ReservationStatus, RoomLock};
pub use events::BookingEvent;
pub use inventory::{DiscountStatus, Hotel, HotelId, Room, RoomId, RoomListing, RoomType};
pub use user::{UserId, UserIdentity, UserRole};

/// Returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
