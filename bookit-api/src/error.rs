use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookit_core::CoreError;
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Core(CoreError::BadRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Core(CoreError::BadRequest(rejection.body_text()))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Core(err) => match err {
                CoreError::BadRequest(_) | CoreError::LockConflict { .. } => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::DateConflict { .. } | CoreError::StateConflict(_) => StatusCode::CONFLICT,
                CoreError::LockRequired | CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::QuotaExceeded { .. } | CoreError::CoolingDown { .. } => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Core(err) => err.reason(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = Map::new();

        let message = match &self {
            AppError::Core(CoreError::Internal(err)) => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        body.insert("error".into(), Value::String(message));
        body.insert("reason".into(), Value::String(self.reason().into()));

        match &self {
            AppError::Core(CoreError::LockConflict { room_ids }) => {
                body.insert("conflicts".into(), json!(room_ids));
            }
            AppError::Core(CoreError::DateConflict { available_from }) => {
                body.insert("available_from".into(), json!(available_from));
            }
            AppError::Core(CoreError::QuotaExceeded { until })
            | AppError::Core(CoreError::CoolingDown { until }) => {
                body.insert("cooldown_until".into(), json!(until));
            }
            _ => {}
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use bookit_shared::RoomId;
    use chrono::NaiveDate;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_lock_conflict_lists_rooms() {
        let (status, body) = render(CoreError::LockConflict { room_ids: vec![RoomId(101)] }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["reason"], "lock_conflict");
        assert_eq!(body["conflicts"], json!([101]));
    }

    #[tokio::test]
    async fn test_date_conflict_carries_free_date() {
        let err = CoreError::DateConflict {
            available_from: NaiveDate::from_ymd_opt(2030, 3, 4),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Room already reserved");
        assert_eq!(body["available_from"], "2030-03-04");
    }

    #[tokio::test]
    async fn test_internal_error_is_not_leaked() {
        let err = CoreError::Internal(bookit_core::StoreError::backend("connection refused"));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }
}
