//! Settings database access
//!
//! Key-value runtime settings stored in the `settings` table. Every key the
//! services read has a built-in default that is written at initialization;
//! NULL values are reset to the default.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};

/// Points a user needs per level (level = 1 + points / points_per_level)
pub const POINTS_PER_LEVEL: &str = "points_per_level";
/// Page size for mission lists when the caller gives none
pub const MISSION_LIST_DEFAULT_LIMIT: &str = "mission_list_default_limit";
/// Page size for the leaderboard when the caller gives none
pub const LEADERBOARD_DEFAULT_LIMIT: &str = "leaderboard_default_limit";
/// Page size for the recent achievements feed when the caller gives none
pub const RECENT_ACHIEVEMENTS_DEFAULT_LIMIT: &str = "recent_achievements_default_limit";
/// Seed the sample mission catalog during startup
pub const SEED_CATALOG_ON_START: &str = "seed_catalog_on_start";

/// Built-in defaults for every known setting
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (POINTS_PER_LEVEL, "1000"),
    (MISSION_LIST_DEFAULT_LIMIT, "10"),
    (LEADERBOARD_DEFAULT_LIMIT, "100"),
    (RECENT_ACHIEVEMENTS_DEFAULT_LIMIT, "10"),
    (SEED_CATALOG_ON_START, "true"),
];

/// Initialize or repair default settings
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, default_value) in DEFAULT_SETTINGS {
        ensure_setting(pool, key, default_value).await?;
    }

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// Missing settings are created; NULL settings are reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE so concurrent initializers don't race on the key
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Generic setting getter
///
/// Returns `None` when the key is missing or NULL.
pub async fn get_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(s) => s.trim().parse::<T>().map(Some).map_err(|_| {
            Error::Config(format!("Failed to parse setting '{}' value: {}", key, s))
        }),
        None => Ok(None),
    }
}

/// Setting getter falling back to a default for missing/NULL values
pub async fn get_setting_or<T: FromStr>(pool: &SqlitePool, key: &str, default: T) -> Result<T> {
    Ok(get_setting(pool, key).await?.unwrap_or(default))
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(pool: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
