use axum::{extract::State, Json};
use bookit_core::search::SearchQuery;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// POST /room-api/all-rooms/
pub async fn search_rooms(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let report = state.search.search(&query).await?;
    Ok(Json(json!({ "data": report })))
}
