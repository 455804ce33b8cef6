//! Database initialization
//!
//! Opens (creating if necessary) the SQLite file and brings the schema up to
//! date. Every statement is idempotent, so this runs on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the database at `db_path`, creating file and parent directory if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
///
/// Also enables foreign keys on the connection it runs on, which is the only
/// connection for single-connection in-memory pools used in tests.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_users_table(pool).await?;
    create_auth_tokens_table(pool).await?;
    create_qsos_table(pool).await?;
    create_callsign_cache_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Bearer tokens, keyed by SHA-256 of the token
async fn create_auth_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Contact log
///
/// `qso_date` is `YYYY-MM-DD` and `time_on` is `HH:MM:SS`, so text ordering
/// is chronological.
async fn create_qsos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS qsos (
            id TEXT PRIMARY KEY,
            created_by TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            call TEXT NOT NULL,
            band TEXT,
            freq REAL,
            mode TEXT,
            rst_sent TEXT,
            rst_rcvd TEXT,
            qso_date TEXT,
            time_on TEXT,
            name TEXT,
            qth TEXT,
            grid TEXT,
            dxcc TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_qsos_owner_call ON qsos(created_by, call)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_callsign_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS callsign_cache (
            callsign TEXT PRIMARY KEY,
            name TEXT,
            qth TEXT,
            grid TEXT,
            dxcc TEXT,
            cached_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
