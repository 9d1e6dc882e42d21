use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use bookit_core::reservation::ReserveCommand;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// POST /reservation-api/reserve/
pub async fn reserve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(command): ApiJson<ReserveCommand>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = state.committer.reserve(user.id, command).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Reservation and payment successful",
            "reservation": booking.reservation,
            "payment": booking.payment,
        })),
    ))
}

/// GET /reservation-api/reservation/
pub async fn my_reservations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let reservations = state.committer.customer_reservations(user.id).await?;
    Ok(Json(json!({ "data": reservations })))
}

/// GET /reservation-api/all-hotel-reservations/
pub async fn hotel_reservations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, AppError> {
    let reservations = state.committer.hotel_reservations(user.id, user.role).await?;
    Ok(Json(json!({ "data": reservations })))
}

/// POST /reservation-api/reservation/{id}/cancel/
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(reservation_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let reservation = state.committer.cancel(user.id, reservation_id).await?;
    Ok(Json(json!({
        "message": "Reservation canceled",
        "reservation": reservation,
    })))
}
