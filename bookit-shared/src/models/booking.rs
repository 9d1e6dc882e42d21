use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ParseEnumError, RoomId, UserId};

/// Time-boxed claim of one user on one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLock {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub locked_until: DateTime<Utc>,
}

impl RoomLock {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.locked_until > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "canceled" => Ok(ReservationStatus::Canceled),
            _ => Err(ParseEnumError::new("reservation status", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub room_id: RoomId,
    pub customer_id: UserId,
    pub count_of_guests: u32,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Half-open interval overlap against `[check_in, check_out)`.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_out_date > check_in && self.check_in_date < check_out
    }

    pub fn blocks(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.status == ReservationStatus::Confirmed && self.overlaps(check_in, check_out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "In person")]
    InPerson,
    #[serde(rename = "online")]
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::InPerson => "In person",
            PaymentMethod::Online => "online",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in person" | "in-person" | "in_person" => Ok(PaymentMethod::InPerson),
            "online" => Ok(PaymentMethod::Online),
            _ => Err(ParseEnumError::new("payment method", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Confirmed,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(PaymentStatus::Confirmed),
            "canceled" => Ok(PaymentStatus::Canceled),
            _ => Err(ParseEnumError::new("payment status", s)),
        }
    }
}

/// One-to-one with its reservation; written in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn reservation(check_in: &str, check_out: &str, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            room_id: RoomId(1),
            customer_id: UserId(1),
            count_of_guests: 1,
            check_in_date: date(check_in),
            check_out_date: date(check_out),
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        let r = reservation("2030-01-10", "2030-01-12", ReservationStatus::Confirmed);
        assert!(r.overlaps(date("2030-01-11"), date("2030-01-13")));
        assert!(r.overlaps(date("2030-01-08"), date("2030-01-11")));
        // back-to-back stays share a boundary day and do not clash
        assert!(!r.overlaps(date("2030-01-12"), date("2030-01-14")));
        assert!(!r.overlaps(date("2030-01-08"), date("2030-01-10")));
    }

    #[test]
    fn test_canceled_reservation_never_blocks() {
        let r = reservation("2030-01-10", "2030-01-12", ReservationStatus::Canceled);
        assert!(!r.blocks(date("2030-01-10"), date("2030-01-12")));
    }

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!("In person".parse::<PaymentMethod>().unwrap(), PaymentMethod::InPerson);
        assert_eq!("in-person".parse::<PaymentMethod>().unwrap(), PaymentMethod::InPerson);
        assert_eq!("ONLINE".parse::<PaymentMethod>().unwrap(), PaymentMethod::Online);
        assert!("cash".parse::<PaymentMethod>().is_err());
        assert_eq!(serde_json::to_string(&PaymentMethod::InPerson).unwrap(), "\"In person\"");
    }
}
