//! Mission catalog
//!
//! Durable mission and badge definitions. Missions are immutable once
//! published; the only permitted mutation is toggling `active`. Nothing is
//! ever deleted.
//!
//! Seeding relies on the primary key: every insert is `INSERT OR IGNORE`, so
//! racing seeders (or a seeder racing an explicit publish) can never create a
//! duplicate mission.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Mission difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::InvalidInput(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// Badge rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "common" => Ok(Rarity::Common),
            "uncommon" => Ok(Rarity::Uncommon),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            other => Err(Error::InvalidInput(format!("unknown rarity '{}'", other))),
        }
    }
}

/// A published mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: u32,
    pub difficulty: Difficulty,
    pub estimated_time: String,
    pub time_remaining: String,
    pub category: String,
    /// Badge awarded on first completion
    pub reward_badge: Option<String>,
    pub active: bool,
}

impl Mission {
    /// New active mission with display defaults
    pub fn new(id: &str, title: &str, points: u32, difficulty: Difficulty) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            icon: "🌾".to_string(),
            points,
            difficulty,
            estimated_time: String::new(),
            time_remaining: String::new(),
            category: "general".to_string(),
            reward_badge: None,
            active: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_timing(mut self, estimated_time: &str, time_remaining: &str) -> Self {
        self.estimated_time = estimated_time.to_string();
        self.time_remaining = time_remaining.to_string();
        self
    }

    pub fn with_reward_badge(mut self, badge_id: &str) -> Self {
        self.reward_badge = Some(badge_id.to_string());
        self
    }
}

/// A badge definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub rarity: Rarity,
}

impl Badge {
    pub fn new(id: &str, title: &str, description: &str, rarity: Rarity) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            icon: "🏆".to_string(),
            rarity,
        }
    }
}

/// Badges referenced by the sample missions
pub fn sample_badges() -> Vec<Badge> {
    vec![
        Badge::new(
            "compost_master",
            "Compost Master",
            "Built an organic compost pit",
            Rarity::Common,
        ),
        Badge::new(
            "water_warrior",
            "Water Warrior",
            "Installed water-efficient irrigation",
            Rarity::Uncommon,
        ),
        Badge::new(
            "organic_master",
            "Organic Master",
            "Controlled pests without chemicals",
            Rarity::Rare,
        ),
    ]
}

/// Sample mission set written into an empty catalog
pub fn sample_missions() -> Vec<Mission> {
    vec![
        Mission::new("mission_001", "🌱 Set Up Composting", 500, Difficulty::Easy)
            .with_description("Create an organic compost pit on your farm")
            .with_icon("🌱")
            .with_timing("2 hours", "2 days left")
            .with_category("sustainability")
            .with_reward_badge("compost_master"),
        Mission::new("mission_002", "💧 Install Drip Irrigation", 800, Difficulty::Medium)
            .with_description("Set up water-efficient irrigation system")
            .with_icon("💧")
            .with_timing("4 hours", "5 days left")
            .with_category("water_conservation")
            .with_reward_badge("water_warrior"),
        Mission::new("mission_003", "🐛 Natural Pest Control", 1200, Difficulty::Hard)
            .with_description("Use organic methods to control pests")
            .with_icon("🐛")
            .with_timing("6 hours", "7 days left")
            .with_category("organic_farming")
            .with_reward_badge("organic_master"),
    ]
}

#[derive(sqlx::FromRow)]
struct MissionRow {
    id: String,
    title: String,
    description: String,
    icon: String,
    points: u32,
    difficulty: String,
    estimated_time: String,
    time_remaining: String,
    category: String,
    reward_badge: Option<String>,
    active: bool,
}

impl TryFrom<MissionRow> for Mission {
    type Error = Error;

    fn try_from(row: MissionRow) -> Result<Self> {
        let difficulty = row.difficulty.parse().map_err(|_| {
            Error::Internal(format!(
                "mission {} has invalid difficulty '{}'",
                row.id, row.difficulty
            ))
        })?;

        Ok(Mission {
            id: row.id,
            title: row.title,
            description: row.description,
            icon: row.icon,
            points: row.points,
            difficulty,
            estimated_time: row.estimated_time,
            time_remaining: row.time_remaining,
            category: row.category,
            reward_badge: row.reward_badge,
            active: row.active,
        })
    }
}

const MISSION_COLUMNS: &str = "id, title, description, icon, points, difficulty, \
     estimated_time, time_remaining, category, reward_badge, active";

/// Mission and badge catalog backed by the `missions` / `badges` tables
#[derive(Debug, Clone)]
pub struct MissionCatalog {
    pool: SqlitePool,
}

impl MissionCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Seed the sample catalog if no mission has ever been published
    ///
    /// Returns the number of missions inserted by this call.
    pub async fn ensure_seeded(&self) -> Result<u64> {
        if self.count_all().await? > 0 {
            return Ok(0);
        }
        self.seed(&sample_badges(), &sample_missions()).await
    }

    /// Insert badges and missions, ignoring ids that already exist
    ///
    /// Runs in one transaction so readers never see a half-seeded catalog.
    pub async fn seed(&self, badges: &[Badge], missions: &[Mission]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        for badge in badges {
            insert_badge(&mut tx, badge).await?;
        }

        let mut inserted = 0;
        for mission in missions {
            validate_mission(mission)?;
            inserted += insert_mission(&mut tx, mission).await?;
        }

        tx.commit().await?;

        if inserted > 0 {
            info!("Seeded mission catalog with {} mission(s)", inserted);
        }
        Ok(inserted)
    }

    /// Publish a single mission
    ///
    /// Returns `false` when a mission with the same id already exists; the
    /// existing definition is left untouched.
    pub async fn publish(&self, mission: &Mission) -> Result<bool> {
        validate_mission(mission)?;

        if let Some(badge_id) = &mission.reward_badge {
            if self.badge(badge_id).await?.is_none() {
                return Err(Error::InvalidInput(format!(
                    "mission {} references unknown badge {}",
                    mission.id, badge_id
                )));
            }
        }

        let mut conn = self.pool.acquire().await?;
        let inserted = insert_mission(&mut conn, mission).await? > 0;
        if inserted {
            info!("Published mission {} ({} points)", mission.id, mission.points);
        } else {
            debug!("Mission {} already published", mission.id);
        }
        Ok(inserted)
    }

    /// Publish a badge definition; `false` when the id already exists
    pub async fn publish_badge(&self, badge: &Badge) -> Result<bool> {
        if badge.id.trim().is_empty() {
            return Err(Error::InvalidInput("badge id must not be empty".to_string()));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(insert_badge(&mut conn, badge).await? > 0)
    }

    /// Active missions in publication order, at most `limit`
    pub async fn list_active(&self, limit: u32) -> Result<Vec<Mission>> {
        let sql = format!(
            "SELECT {} FROM missions WHERE active = 1 ORDER BY rowid LIMIT ?",
            MISSION_COLUMNS
        );
        let rows: Vec<MissionRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Mission::try_from).collect()
    }

    pub async fn get(&self, mission_id: &str) -> Result<Option<Mission>> {
        let sql = format!("SELECT {} FROM missions WHERE id = ?", MISSION_COLUMNS);
        let row: Option<MissionRow> = sqlx::query_as(&sql)
            .bind(mission_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Mission::try_from).transpose()
    }

    /// Resolve a mission that can currently be completed
    pub async fn get_active(&self, mission_id: &str) -> Result<Mission> {
        match self.get(mission_id).await? {
            Some(mission) if mission.active => Ok(mission),
            _ => Err(Error::MissionNotFound(mission_id.to_string())),
        }
    }

    /// Toggle a mission's `active` flag
    pub async fn set_active(&self, mission_id: &str, active: bool) -> Result<()> {
        let updated = sqlx::query("UPDATE missions SET active = ? WHERE id = ?")
            .bind(active)
            .bind(mission_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(Error::MissionNotFound(mission_id.to_string()));
        }
        info!("Mission {} active = {}", mission_id, active);
        Ok(())
    }

    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM missions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM missions WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn badge(&self, badge_id: &str) -> Result<Option<Badge>> {
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, title, description, icon, rarity FROM badges WHERE id = ?",
        )
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, title, description, icon, rarity)| -> Result<Badge> {
            Ok(Badge {
                id,
                title,
                description,
                icon,
                rarity: rarity.parse()?,
            })
        })
        .transpose()
    }
}

fn validate_mission(mission: &Mission) -> Result<()> {
    if mission.id.trim().is_empty() {
        return Err(Error::InvalidInput("mission id must not be empty".to_string()));
    }
    if mission.title.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "mission {} must have a title",
            mission.id
        )));
    }
    Ok(())
}

async fn insert_badge(conn: &mut sqlx::SqliteConnection, badge: &Badge) -> Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO badges (id, title, description, icon, rarity)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&badge.id)
    .bind(&badge.title)
    .bind(&badge.description)
    .bind(&badge.icon)
    .bind(badge.rarity.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_mission(conn: &mut sqlx::SqliteConnection, mission: &Mission) -> Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO missions
            (id, title, description, icon, points, difficulty,
             estimated_time, time_remaining, category, reward_badge, active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&mission.id)
    .bind(&mission.title)
    .bind(&mission.description)
    .bind(&mission.icon)
    .bind(i64::from(mission.points))
    .bind(mission.difficulty.as_str())
    .bind(&mission.estimated_time)
    .bind(&mission.time_remaining)
    .bind(&mission.category)
    .bind(&mission.reward_badge)
    .bind(mission.active)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
