//! Earned badges
//!
//! Rows are written by the completion workflow inside the completion
//! transaction; this module only reads them.

use crate::catalog::Rarity;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A badge earned by a user, joined with its definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Points of the mission that earned the badge
    pub points: i64,
    pub earned_at: DateTime<Utc>,
    pub rarity: Rarity,
    pub mission_id: String,
    pub user_id: String,
}

#[derive(sqlx::FromRow)]
struct EarnedRow {
    badge_id: String,
    title: String,
    description: String,
    icon: String,
    points: i64,
    earned_at: DateTime<Utc>,
    rarity: String,
    mission_id: String,
    user_id: String,
}

impl TryFrom<EarnedRow> for EarnedBadge {
    type Error = crate::error::Error;

    fn try_from(row: EarnedRow) -> Result<Self> {
        Ok(EarnedBadge {
            rarity: row.rarity.parse()?,
            id: row.badge_id,
            title: row.title,
            description: row.description,
            icon: row.icon,
            points: row.points,
            earned_at: row.earned_at,
            mission_id: row.mission_id,
            user_id: row.user_id,
        })
    }
}

const EARNED_SELECT: &str = r#"
    SELECT a.badge_id, b.title, b.description, b.icon, a.points, a.earned_at,
           b.rarity, a.mission_id, a.user_id
    FROM achievements a
    JOIN badges b ON b.id = a.badge_id
"#;

/// Badges earned by one user, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: &str, limit: u32) -> Result<Vec<EarnedBadge>> {
    let sql = format!(
        "{} WHERE a.user_id = ? ORDER BY a.earned_at DESC, a.rowid DESC LIMIT ?",
        EARNED_SELECT
    );
    let rows: Vec<EarnedRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(EarnedBadge::try_from).collect()
}

/// Most recent achievements across all users
pub async fn recent(pool: &SqlitePool, limit: u32) -> Result<Vec<EarnedBadge>> {
    let sql = format!(
        "{} ORDER BY a.earned_at DESC, a.rowid DESC LIMIT ?",
        EARNED_SELECT
    );
    let rows: Vec<EarnedRow> = sqlx::query_as(&sql)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(EarnedBadge::try_from).collect()
}

pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM achievements WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
