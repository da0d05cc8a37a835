//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Tables are created with their current shape by [`crate::db::init`]; the
//! migrations here bring databases written by older builds up to date. Each
//! one must be safe to run against a database that already has its change.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Highest recorded schema version, 0 for a database that predates versioning
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: Add category column to missions
///
/// Early catalogs stored missions without a category.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('missions') WHERE name = 'category'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  missions.category already exists - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE missions ADD COLUMN category TEXT NOT NULL DEFAULT 'general'")
        .execute(pool)
        .await?;

    info!("  ✓ Added category column to missions table");
    Ok(())
}

/// Migration v2: Backfill achievements from completion facts
///
/// Completions recorded before the achievements table existed still name the
/// badge they awarded; copy those into `achievements`.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO achievements (user_id, badge_id, mission_id, points, earned_at)
        SELECT c.user_id, c.badge_id, c.mission_id, c.points_awarded, c.completed_at
        FROM mission_completions c
        JOIN badges b ON b.id = c.badge_id
        WHERE c.badge_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    info!(
        "  ✓ Backfilled {} achievement(s) from completions",
        result.rows_affected()
    );
    Ok(())
}
