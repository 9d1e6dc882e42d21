pub mod cooldown;
pub mod dates;
pub mod locks;
pub mod memory;
pub mod notify;
pub mod pricing;
pub mod repository;
pub mod reservation;
pub mod search;

use bookit_shared::RoomId;
use chrono::{DateTime, NaiveDate, Utc};

pub use repository::{StoreError, StoreResult};

/// Every failure the booking core reports to its callers.
///
/// Store failures are folded into `Internal`; nothing driver-specific crosses this boundary.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Some rooms are already locked")]
    LockConflict { room_ids: Vec<RoomId> },
    #[error("Room already reserved")]
    DateConflict { available_from: Option<NaiveDate> },
    #[error("{0}")]
    StateConflict(String),
    #[error("Room not locked or lock expired")]
    LockRequired,
    #[error("{0}")]
    Forbidden(String),
    #[error("Maximum number of room locks reached")]
    QuotaExceeded { until: DateTime<Utc> },
    #[error("Too many lock attempts, try again later")]
    CoolingDown { until: DateTime<Utc> },
    #[error("Internal service error: {0}")]
    Internal(#[from] StoreError),
}

impl CoreError {
    /// Stable code clients can match on.
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "bad_request",
            CoreError::NotFound(_) => "not_found",
            CoreError::LockConflict { .. } => "lock_conflict",
            CoreError::DateConflict { .. } => "date_conflict",
            CoreError::StateConflict(_) => "state_conflict",
            CoreError::LockRequired => "lock_required",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::QuotaExceeded { .. } => "quota_exceeded",
            CoreError::CoolingDown { .. } => "rate_limited",
            CoreError::Internal(_) => "internal",
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        CoreError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
