//! Runtime settings for the gamification store
//!
//! Bootstrap configuration (root folder, logging) comes from TOML via
//! `fq_common::config`. Everything below lives in the `settings` table and is
//! read once when the service opens.

use crate::error::Result;
use fq_common::db::settings::{
    self, LEADERBOARD_DEFAULT_LIMIT, MISSION_LIST_DEFAULT_LIMIT, POINTS_PER_LEVEL,
    RECENT_ACHIEVEMENTS_DEFAULT_LIMIT, SEED_CATALOG_ON_START,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Database-backed settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamificationSettings {
    pub points_per_level: u32,
    pub mission_list_default_limit: u32,
    pub leaderboard_default_limit: u64,
    pub recent_achievements_default_limit: u32,
    pub seed_catalog_on_start: bool,
}

impl Default for GamificationSettings {
    fn default() -> Self {
        Self {
            points_per_level: 1000,
            mission_list_default_limit: 10,
            leaderboard_default_limit: 100,
            recent_achievements_default_limit: 10,
            seed_catalog_on_start: true,
        }
    }
}

impl GamificationSettings {
    /// Load settings, using built-in defaults for missing or NULL keys
    ///
    /// Unparseable values are a `Config` error. A zero page size or zero
    /// `points_per_level` falls back to the default.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let mut loaded = Self {
            points_per_level: settings::get_setting_or(
                pool,
                POINTS_PER_LEVEL,
                defaults.points_per_level,
            )
            .await?,
            mission_list_default_limit: settings::get_setting_or(
                pool,
                MISSION_LIST_DEFAULT_LIMIT,
                defaults.mission_list_default_limit,
            )
            .await?,
            leaderboard_default_limit: settings::get_setting_or(
                pool,
                LEADERBOARD_DEFAULT_LIMIT,
                defaults.leaderboard_default_limit,
            )
            .await?,
            recent_achievements_default_limit: settings::get_setting_or(
                pool,
                RECENT_ACHIEVEMENTS_DEFAULT_LIMIT,
                defaults.recent_achievements_default_limit,
            )
            .await?,
            seed_catalog_on_start: settings::get_setting_or(
                pool,
                SEED_CATALOG_ON_START,
                defaults.seed_catalog_on_start,
            )
            .await?,
        };

        if loaded.points_per_level == 0 {
            warn!("points_per_level is 0, using {}", defaults.points_per_level);
            loaded.points_per_level = defaults.points_per_level;
        }
        if loaded.mission_list_default_limit == 0 {
            loaded.mission_list_default_limit = defaults.mission_list_default_limit;
        }
        if loaded.leaderboard_default_limit == 0 {
            loaded.leaderboard_default_limit = defaults.leaderboard_default_limit;
        }
        if loaded.recent_achievements_default_limit == 0 {
            loaded.recent_achievements_default_limit = defaults.recent_achievements_default_limit;
        }

        info!(
            "Settings: {} points/level, seed on start = {}",
            loaded.points_per_level, loaded.seed_catalog_on_start
        );
        Ok(loaded)
    }
}
