//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up to date.
//! Every statement is idempotent, so this runs on each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// SQLite busy timeout; writes that still fail are retried by the service
const BUSY_TIMEOUT_MS: u64 = 250;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_artist_profiles_table(pool).await?;
    create_sessions_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (shared auth secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Identity store: one row per account
async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('customer', 'artist', 'admin')),
            phone TEXT,
            profile_image TEXT,
            preferences TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Artist profile store
///
/// `specializations` and `portfolio` are JSON arrays. The rating aggregate is
/// kept as (rating_sum, rating_count); the average is derived on read.
async fn create_artist_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_profiles (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(guid),
            bio TEXT,
            location TEXT,
            specializations TEXT NOT NULL DEFAULT '[]',
            portfolio TEXT NOT NULL DEFAULT '[]',
            session_rate REAL NOT NULL DEFAULT 0 CHECK (session_rate >= 0),
            currency TEXT NOT NULL DEFAULT 'INR',
            rating_sum INTEGER NOT NULL DEFAULT 0 CHECK (rating_sum >= 0),
            rating_count INTEGER NOT NULL DEFAULT 0 CHECK (rating_count >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_artist_profiles_active ON artist_profiles(is_active)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Session record store
///
/// `scheduled_at_ms` is Unix milliseconds so the overlap query can compare
/// `scheduled_at_ms + duration_minutes * 60000` directly.
async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            guid TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES users(guid),
            artist_id TEXT NOT NULL REFERENCES artist_profiles(guid),
            session_type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            scheduled_at_ms INTEGER NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            format TEXT NOT NULL,
            location TEXT,
            meeting_link TEXT,
            amount REAL NOT NULL CHECK (amount >= 0),
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            payment_status TEXT NOT NULL DEFAULT 'pending',
            rating_score INTEGER CHECK (rating_score BETWEEN 1 AND 5),
            rating_review TEXT,
            rated_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_artist_schedule ON sessions(artist_id, scheduled_at_ms)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_customer ON sessions(customer_id)")
        .execute(pool)
        .await?;

    Ok(())
}
