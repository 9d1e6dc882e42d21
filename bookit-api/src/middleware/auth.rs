use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bookit_shared::{UserId, UserRole};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Numeric user id.
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// The authenticated caller, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| AppError::Unauthorized("Invalid token role".to_string()))?;
        Ok(CurrentUser {
            id: UserId(id),
            role,
        })
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let user = CurrentUser::try_from(token_data.claims)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
