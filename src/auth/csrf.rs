//! CSRF tokens bound to a session.
//!
//! The token is an HMAC-SHA256 of the raw session token under a server
//! secret, so it needs no storage and dies with the session.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_HEADER: &str = "x-csrf-token";

fn mac(secret: &str, session_token: &str) -> Result<HmacSha256, AppError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("CSRF key rejected: {e}")))?;
    mac.update(session_token.as_bytes());
    Ok(mac)
}

pub fn make_token(secret: &str, session_token: &str) -> Result<String, AppError> {
    Ok(hex::encode(mac(secret, session_token)?.finalize().into_bytes()))
}

/// Constant-time check of a client-supplied token. Malformed input is
/// `Ok(false)`; only a broken key is an error.
pub fn validate_token(
    secret: &str,
    session_token: &str,
    candidate: &str,
) -> Result<bool, AppError> {
    let Ok(candidate) = hex::decode(candidate.trim()) else {
        return Ok(false);
    };
    Ok(mac(secret, session_token)?.verify_slice(&candidate).is_ok())
}
