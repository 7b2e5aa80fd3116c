use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password;
use crate::error::UserError;
use crate::pagination::PaginationQuery;

/// A user account and its credential.
///
/// `password` holds plaintext only between construction and
/// [`User::prepare_create`]; once persisted it is always an Argon2 PHC string.
/// It is never serialized, and every value handed to a caller outside the
/// repository must have gone through [`User::redact`].
#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize, Validate)]
pub struct User {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 30, message = "name must be 1 to 30 characters"))]
    pub name: String,
    #[validate(
        length(min = 1, max = 60, message = "email must be 1 to 60 characters"),
        email(message = "email is not a valid address")
    )]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub login_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Trims the name and password, trims and lowercases the email.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.password = self.password.trim().to_string();
    }

    /// Normalizes, validates and hashes in place. Call exactly once per
    /// registration, before the record is handed to the repository.
    pub fn prepare_create(&mut self) -> Result<(), UserError> {
        self.normalize();
        self.validate()?;
        self.hash_password()
    }

    /// Replaces the current password value with its salted hash.
    pub fn hash_password(&mut self) -> Result<(), UserError> {
        self.password = password::hash(&self.password)?;
        Ok(())
    }

    /// Checks a plaintext candidate against the stored hash.
    pub fn compare_password(&self, candidate: &str) -> Result<(), UserError> {
        password::verify(candidate, &self.password)
    }

    pub fn redact(&mut self) {
        self.password.clear();
    }

    pub fn redacted(mut self) -> Self {
        self.redact();
        self
    }
}

/// A partial update of an existing user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct UserUpdate {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 30, message = "name must be 1 to 30 characters"))]
    pub name: Option<String>,
    #[validate(
        length(min = 1, max = 60, message = "email must be 1 to 60 characters"),
        email(message = "email is not a valid address")
    )]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }

    /// Applies the same normalization as registration, validates the
    /// supplied fields and hashes a new password if one was given.
    pub fn prepare(&mut self) -> Result<(), UserError> {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(email) = self.email.as_mut() {
            *email = normalize_email(email);
        }
        if let Some(password) = self.password.as_mut() {
            *password = password.trim().to_string();
        }

        if self.is_empty() {
            return Err(UserError::Validation(
                "at least one of name, email or password is required".to_string(),
            ));
        }
        self.validate()?;

        if let Some(plain) = self.password.take() {
            self.password = Some(password::hash(&plain)?);
        }
        Ok(())
    }
}

/// One page of users plus the paging metadata for it.
#[derive(Debug, Clone, Serialize)]
pub struct UsersList {
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
    pub users: Vec<User>,
}

impl UsersList {
    pub fn new(total_count: i64, query: &PaginationQuery, users: Vec<User>) -> Self {
        Self {
            total_count,
            total_pages: query.total_pages(total_count),
            page: query.page(),
            size: query.size(),
            has_more: query.has_more(total_count),
            users: users.into_iter().map(User::redacted).collect(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
