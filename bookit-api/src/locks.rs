use axum::{extract::State, Extension, Json};
use bookit_shared::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoomIdsRequest {
    #[serde(default)]
    pub room_ids: Vec<RoomId>,
}

#[derive(Debug, Serialize)]
pub struct LockRoomsResponse {
    pub success: bool,
    pub locked_until: DateTime<Utc>,
    pub locked_rooms: Vec<RoomId>,
    pub remaining_locks: usize,
}

/// POST /reservation-api/lock-rooms/
pub async fn lock_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<RoomIdsRequest>,
) -> Result<Json<LockRoomsResponse>, AppError> {
    let grant = state.locks.acquire_locks(user.id, &req.room_ids).await?;
    Ok(Json(LockRoomsResponse {
        success: true,
        locked_until: grant.locked_until,
        locked_rooms: grant.locked_rooms,
        remaining_locks: grant.remaining_slots,
    }))
}

/// POST /reservation-api/unlock-rooms/
pub async fn unlock_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<RoomIdsRequest>,
) -> Result<Json<Value>, AppError> {
    let unlocked = state.locks.release_locks(user.id, &req.room_ids).await?;
    Ok(Json(json!({ "unlocked": unlocked })))
}

/// GET /reservation-api/locks/
pub async fn my_locks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let locks = state.locks.live_locks(user.id).await?;
    Ok(Json(json!({ "locks": locks })))
}
