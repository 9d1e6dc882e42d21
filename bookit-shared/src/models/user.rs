use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;
use crate::pii::Masked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Customer,
    HotelManager,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Customer => "Customer",
            UserRole::HotelManager => "HotelManager",
            UserRole::Admin => "Admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "customer" => Ok(UserRole::Customer),
            "hotelmanager" => Ok(UserRole::HotelManager),
            "admin" => Ok(UserRole::Admin),
            _ => Err(ParseEnumError::new("user role", s)),
        }
    }
}

/// What the booking core needs to know about the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: Masked<String>,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Customer".parse::<UserRole>().unwrap(), UserRole::Customer);
        assert_eq!("HOTEL_MANAGER".parse::<UserRole>().unwrap(), UserRole::HotelManager);
        assert_eq!("Hotel Manager".parse::<UserRole>().unwrap(), UserRole::HotelManager);
        assert!("superuser".parse::<UserRole>().is_err());
    }
}
