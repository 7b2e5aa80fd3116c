use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::db;
use crate::error::AppError;

pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Expiry instant for a session opened at `now`.
pub fn expires_at(
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AppError> {
    chrono::Duration::from_std(config.ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(format!("session TTL out of range: {:?}", config.ttl)))
}

/// Opens a session for `user_id` and returns the raw token for the cookie.
/// Expired sessions of the same user are purged on the way.
pub async fn start(
    pool: &PgPool,
    config: &SessionConfig,
    user_id: Uuid,
) -> Result<String, AppError> {
    let expiry = expires_at(config, Utc::now())?;

    let purged = db::sessions::delete_expired_for_user(pool, user_id).await?;
    if purged > 0 {
        tracing::debug!(%user_id, purged, "purged expired sessions");
    }

    let token = generate_token();
    db::sessions::create(pool, user_id, &hash_token(&token), expiry).await?;
    Ok(token)
}

pub fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<Cookie<'static>, AppError> {
    let max_age = time::Duration::try_from(config.ttl)
        .map_err(|e| AppError::Internal(format!("session TTL out of range: {e}")))?;

    Ok(Cookie::build((config.cookie_name.clone(), token.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build())
}

pub fn clear_session_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            cookie_name: "session-id".to_string(),
            ttl: Duration::from_secs(3600),
            secure_cookie: true,
        }
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_and_differs_from_token() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token).len(), 64);
    }

    #[test]
    fn session_cookie_is_locked_down() {
        let cookie = session_cookie(&config(), "abc").unwrap();
        assert_eq!(cookie.name(), "session-id");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&config());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let now = Utc::now();
        let expiry = expires_at(&config(), now).unwrap();
        assert_eq!(expiry - now, chrono::Duration::seconds(3600));
    }

    #[test]
    fn unrepresentable_ttl_is_an_error() {
        let config = SessionConfig {
            ttl: Duration::from_secs(u64::MAX),
            ..config()
        };
        assert!(matches!(expires_at(&config, Utc::now()), Err(AppError::Internal(_))));
        assert!(matches!(session_cookie(&config, "abc"), Err(AppError::Internal(_))));
    }
}
