use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::auth_service::{TOKEN_USE_ACCESS, decode_token, jwt_secret},
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_staff: bool,
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_staff {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = jwt_secret()?;
        let claims = decode_token(token, &secret)?;

        // Refresh tokens are only good for /auth/refresh and /auth/logout.
        if claims.token_use != TOKEN_USE_ACCESS {
            return Err(AppError::Unauthorized("Not an access token".into()));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            is_staff: claims.staff,
        })
    }
}
