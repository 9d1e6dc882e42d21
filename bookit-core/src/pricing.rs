use bookit_shared::{PaymentMethod, RoomListing};
use chrono::{DateTime, Utc};

/// Amount charged for a stay, in cents.
///
/// In-person payments pay half the room price; the hotel discount is then taken off the
/// halved amount. Each step rounds half up.
pub fn quote_amount(listing: &RoomListing, method: PaymentMethod, now: DateTime<Utc>) -> i64 {
    let mut amount = listing.room.price_cents;
    if method == PaymentMethod::InPerson {
        amount = (amount + 1) / 2;
    }
    if listing.hotel.discount_applies(now) {
        amount -= percent_of(amount, listing.hotel.discount_percent);
    }
    amount.max(0)
}

/// Room price with the hotel discount applied, as shown in search results.
pub fn discounted_price(listing: &RoomListing, now: DateTime<Utc>) -> i64 {
    quote_amount(listing, PaymentMethod::Online, now)
}

fn percent_of(amount: i64, percent: i32) -> i64 {
    let percent = i64::from(percent.clamp(0, 100));
    (amount * percent + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookit_shared::{DiscountStatus, Hotel, HotelId, Room, RoomId, RoomType, UserId};
    use chrono::Duration;

    fn listing(price_cents: i64, status: DiscountStatus, ends_in_days: Option<i64>) -> RoomListing {
        let now = Utc::now();
        RoomListing {
            room: Room {
                id: RoomId(101),
                hotel_id: HotelId(1),
                room_number: 101,
                name: "Deluxe Room".to_string(),
                room_type: RoomType::Double,
                price_cents,
            },
            hotel: Hotel {
                id: HotelId(1),
                manager_id: UserId(2),
                name: "Test Hotel".to_string(),
                location: "Test City".to_string(),
                discount_percent: 10,
                discount_status: status,
                discount_start_date: None,
                discount_end_date: ends_in_days.map(|d| now + Duration::days(d)),
            },
        }
    }

    #[test]
    fn test_in_person_halves_before_discount() {
        let l = listing(15000, DiscountStatus::Active, Some(3));
        // (150 / 2) - (150 / 2 * 10 / 100) = 67.50
        assert_eq!(quote_amount(&l, PaymentMethod::InPerson, Utc::now()), 6750);
    }

    #[test]
    fn test_online_full_price_with_discount() {
        let l = listing(15000, DiscountStatus::Active, Some(3));
        assert_eq!(quote_amount(&l, PaymentMethod::Online, Utc::now()), 13500);
    }

    #[test]
    fn test_expired_or_inactive_discount_ignored() {
        let now = Utc::now();
        assert_eq!(quote_amount(&listing(15000, DiscountStatus::Active, Some(-1)), PaymentMethod::Online, now), 15000);
        assert_eq!(quote_amount(&listing(15000, DiscountStatus::Active, None), PaymentMethod::Online, now), 15000);
        assert_eq!(quote_amount(&listing(15000, DiscountStatus::Inactive, Some(3)), PaymentMethod::InPerson, now), 7500);
    }

    #[test]
    fn test_odd_cents_round_half_up() {
        let l = listing(15001, DiscountStatus::Inactive, None);
        assert_eq!(quote_amount(&l, PaymentMethod::InPerson, Utc::now()), 7501);
    }
}
