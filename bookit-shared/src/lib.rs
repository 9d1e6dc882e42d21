pub mod models;
pub mod pii;

pub use models::{
    BookingEvent, DiscountStatus, Hotel, HotelId, ParseEnumError, Payment, PaymentMethod,
    PaymentStatus, Reservation, ReservationStatus, Room, RoomId, RoomListing, RoomLock,
    RoomType, UserId, UserIdentity, UserRole,
};
