use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;
use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Single,
    Double,
    Triple,
}

impl RoomType {
    /// Guests a single room of this type can host.
    pub fn capacity(self) -> u32 {
        match self {
            RoomType::Single => 1,
            RoomType::Double => 2,
            RoomType::Triple => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoomType::Single => "Single",
            RoomType::Double => "Double",
            RoomType::Triple => "Triple",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(RoomType::Single),
            "double" => Ok(RoomType::Double),
            "triple" => Ok(RoomType::Triple),
            _ => Err(ParseEnumError::new("room type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountStatus {
    Active,
    Inactive,
    Expired,
}

impl DiscountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountStatus::Active => "Active",
            DiscountStatus::Inactive => "Inactive",
            DiscountStatus::Expired => "Expired",
        }
    }
}

impl FromStr for DiscountStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(DiscountStatus::Active),
            "inactive" => Ok(DiscountStatus::Inactive),
            "expired" => Ok(DiscountStatus::Expired),
            _ => Err(ParseEnumError::new("discount status", s)),
        }
    }
}

/// Hotel record as owned by the catalog side of the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub manager_id: UserId,
    pub name: String,
    pub location: String,
    /// Whole percent, 0..=100.
    pub discount_percent: i32,
    pub discount_status: DiscountStatus,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
}

impl Hotel {
    /// The discount applies only while active and before a known end date.
    pub fn discount_applies(&self, now: DateTime<Utc>) -> bool {
        self.discount_status == DiscountStatus::Active
            && self.discount_percent > 0
            && self.discount_end_date.map_or(false, |end| end > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub room_number: i32,
    pub name: String,
    pub room_type: RoomType,
    pub price_cents: i64,
}

impl Room {
    pub fn capacity(&self) -> u32 {
        self.room_type.capacity()
    }
}

/// A room together with the hotel it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListing {
    pub room: Room,
    pub hotel: Hotel,
}
