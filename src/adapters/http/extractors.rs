//! Axum extractors for authentication.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::{adapters::http::app_state::AppState, app_error::AppError, jwt};

/// Account authenticated by a bearer session token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::InvalidCredentials)?;

        let claims = jwt::verify(token, &state.config.jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.user_id()?,
        })
    }
}
