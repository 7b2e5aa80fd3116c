use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::{csrf, session};
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

/// The user behind a live session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub session_token: String,
}

impl FromRequestParts<SharedState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.config.session.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing session".to_string()))?;

        let token_hash = session::hash_token(&token);
        let Some(found) = db::sessions::find_active(&state.pool, &token_hash).await? else {
            tracing::debug!("rejected unknown or expired session");
            return Err(AppError::Unauthorized(
                "Session is invalid or has expired".to_string(),
            ));
        };

        Ok(SessionUser {
            user_id: found.user_id,
            session_token: token,
        })
    }
}

/// A [`SessionUser`] that also presented a valid `X-CSRF-Token` header.
#[derive(Debug, Clone)]
pub struct CsrfGuard(pub SessionUser);

impl FromRequestParts<SharedState> for CsrfGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = SessionUser::from_request_parts(parts, state).await?;

        let candidate = parts
            .headers
            .get(csrf::CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Forbidden("Missing CSRF token".to_string()))?;

        if !csrf::validate_token(&state.config.csrf_secret, &user.session_token, candidate)? {
            tracing::warn!(user_id = %user.user_id, "invalid CSRF token");
            return Err(AppError::Forbidden("Invalid CSRF token".to_string()));
        }

        Ok(CsrfGuard(user))
    }
}
