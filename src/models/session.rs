use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A signed-in browser session. Only the SHA-256 of the cookie value is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
