use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::UserError;
use crate::models::user::normalize_email;
use crate::models::{User, UserUpdate, UsersList};
use crate::pagination::PaginationQuery;

pub const EMAIL_CONSTRAINT: &str = "users_email_key";
pub const NAME_CONSTRAINT: &str = "users_name_key";

/// The only component that touches the `users` table.
///
/// Records are returned redacted except by [`UserRepository::find_by_email`],
/// which exists to feed password checks.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a user whose password has already been hashed.
    pub async fn register(&self, user: &User) -> Result<User, UserError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password)
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(created.redacted())
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<User, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::redacted)
            .ok_or(UserError::NotFound)
    }

    /// Looks a user up by normalized email. The returned record still carries
    /// its password hash; callers must redact before it leaves the process.
    pub async fn find_by_email(&self, email: &str) -> Result<User, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Case-insensitive substring match on `name`.
    pub async fn find_by_name(
        &self,
        name: &str,
        query: &PaginationQuery,
    ) -> Result<UsersList, UserError> {
        let pattern = format!("%{}%", escape_like(name.trim()));

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE name ILIKE $1 ESCAPE '\\'")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        if total == 0 {
            return Ok(UsersList::new(0, query, Vec::new()));
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users WHERE name ILIKE $1 ESCAPE '\\'
             ORDER BY {} LIMIT $2 OFFSET $3",
            query.order_by().to_sql()
        ))
        .bind(&pattern)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(UsersList::new(total, query, users))
    }

    pub async fn get_users(&self, query: &PaginationQuery) -> Result<UsersList, UserError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok(UsersList::new(0, query, Vec::new()));
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users ORDER BY {} LIMIT $1 OFFSET $2",
            query.order_by().to_sql()
        ))
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(UsersList::new(total, query, users))
    }

    /// Applies a prepared partial update. A missing row is reported through
    /// the empty `RETURNING` set rather than a prior lookup.
    pub async fn update(&self, update: &UserUpdate) -> Result<User, UserError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 password = COALESCE($4, password),
                 updated_at = now()
             WHERE user_id = $1
             RETURNING *",
        )
        .bind(update.user_id)
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.password.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .map(User::redacted)
        .ok_or(UserError::NotFound)
    }

    /// Stamps a successful login and returns the stored timestamp.
    pub async fn touch_login_date(&self, user_id: Uuid) -> Result<DateTime<Utc>, UserError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE users SET login_date = now() WHERE user_id = $1 RETURNING login_date",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserError::NotFound)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), UserError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }
}

fn map_write_error(err: sqlx::Error) -> UserError {
    let duplicate = err
        .as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .and_then(|db_err| duplicate_kind(db_err.constraint()));

    duplicate.unwrap_or(UserError::Database(err))
}

fn duplicate_kind(constraint: Option<&str>) -> Option<UserError> {
    match constraint {
        Some(EMAIL_CONSTRAINT) => Some(UserError::DuplicateEmail),
        Some(NAME_CONSTRAINT) => Some(UserError::DuplicateName),
        _ => None,
    }
}

/// Escapes LIKE metacharacters so the needle matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
