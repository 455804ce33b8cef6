//! Bearer token storage
//!
//! Only SHA-256 digests of tokens are stored (see `hamlog_common::auth::token_digest`).

use chrono::{DateTime, Utc};
use hamlog_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_timestamp;
use super::users::{user_from_row, User};

pub async fn insert_token(
    pool: &SqlitePool,
    token_hash: &str,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT INTO auth_tokens (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

/// Resolve a token digest to its active, unexpired owner
pub async fn find_user_by_token(
    pool: &SqlitePool,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT u.id, u.email, u.is_active, u.created_at, t.expires_at
        FROM auth_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token_hash = ? AND u.is_active = 1
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: String = row.get("expires_at");
    if parse_timestamp("auth_tokens.expires_at", &expires_at)? <= now {
        return Ok(None);
    }

    user_from_row(&row).map(Some)
}

pub async fn revoke_token(pool: &SqlitePool, token_hash: &str) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete tokens that expired before `now`; returns the number removed
pub async fn purge_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    // rfc3339 strings from the same offset compare chronologically
    let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= ?")
        .bind(now.to_rfc3339())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
