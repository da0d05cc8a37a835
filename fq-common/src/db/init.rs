//! Database initialization
//!
//! Opens (or creates) the SQLite database, creates every table the
//! gamification store needs, runs versioned migrations and ensures default
//! settings exist. Safe to call on every startup.

use crate::time::millis_to_duration;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every pooled connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Connection options apply to every connection the pool opens, so WAL,
    // foreign keys and the busy timeout hold for concurrent writers too.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(millis_to_duration(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    crate::db::settings::init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_badges_table(pool).await?;
    create_missions_table(pool).await?;
    create_mission_progress_table(pool).await?;
    create_mission_completions_table(pool).await?;
    create_achievements_table(pool).await?;
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
/// Stores runtime configuration key-value pairs.
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

async fn create_badges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badges (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '🏆',
            rarity TEXT NOT NULL DEFAULT 'common'
                CHECK (rarity IN ('common', 'uncommon', 'rare', 'epic', 'legendary'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Mission catalog
///
/// The primary key is the uniqueness constraint that makes concurrent
/// seeding safe. Publication order is the implicit rowid order.
async fn create_missions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS missions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '🌾',
            points INTEGER NOT NULL CHECK (points >= 0),
            difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
            estimated_time TEXT NOT NULL DEFAULT '',
            time_remaining TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'general',
            reward_badge TEXT REFERENCES badges(id),
            active INTEGER NOT NULL DEFAULT 1,
            published_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_missions_active ON missions(active)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_mission_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mission_progress (
            user_id TEXT NOT NULL,
            mission_id TEXT NOT NULL REFERENCES missions(id),
            percentage INTEGER NOT NULL DEFAULT 0 CHECK (percentage BETWEEN 0 AND 100),
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, mission_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only completion facts, one per (user, mission)
async fn create_mission_completions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mission_completions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            completion_id TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            mission_id TEXT NOT NULL REFERENCES missions(id),
            points_awarded INTEGER NOT NULL CHECK (points_awarded >= 0),
            badge_id TEXT,
            evidence TEXT,
            completed_at TIMESTAMP NOT NULL,
            UNIQUE (user_id, mission_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_completions_user ON mission_completions(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_achievements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS achievements (
            user_id TEXT NOT NULL,
            badge_id TEXT NOT NULL REFERENCES badges(id),
            mission_id TEXT NOT NULL,
            points INTEGER NOT NULL DEFAULT 0,
            earned_at TIMESTAMP NOT NULL,
            PRIMARY KEY (user_id, badge_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_achievements_earned_at ON achievements(earned_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
