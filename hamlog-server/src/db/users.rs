//! User accounts

use chrono::{DateTime, Utc};
use hamlog_common::auth::PasswordHash;
use hamlog_common::{Error, Result};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Account plus stored credential material, for login
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let is_active: i64 = row.get("is_active");

    Ok(User {
        id: parse_uuid("users.id", &id)?,
        email: row.get("email"),
        is_active: is_active != 0,
        created_at: parse_timestamp("users.created_at", &created_at)?,
    })
}

/// Create an account; `email` is stored lower-cased
///
/// # Errors
/// [`Error::InvalidInput`] if the email is already registered.
pub async fn create_user(pool: &SqlitePool, email: &str, password: &PasswordHash) -> Result<User> {
    let user = User {
        id: Uuid::new_v4(),
        email: email.trim().to_lowercase(),
        is_active: true,
        created_at: Utc::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, password_salt, is_active, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&password.hash)
    .bind(&password.salt)
    .bind(user.created_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(user),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::InvalidInput("Email already registered".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, is_active, created_at FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Look up credentials by (case-insensitive) email
pub async fn find_credentials(pool: &SqlitePool, email: &str) -> Result<Option<UserCredentials>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, is_active, created_at, password_hash, password_salt
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(UserCredentials {
            user: user_from_row(&row)?,
            password_hash: row.get("password_hash"),
            password_salt: row.get("password_salt"),
        })),
        None => Ok(None),
    }
}
