//! Per-(user, mission) progress tracking
//!
//! Progress is a percentage in 0..=100 that never decreases. Writes are a
//! single `INSERT .. ON CONFLICT DO UPDATE SET percentage = MAX(..)` so
//! concurrent updates to one key serialize inside SQLite and the stored value
//! is always the maximum ever written.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use fq_common::time;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

/// Completion state of one (user, mission) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    NotStarted,
    InProgress,
    /// Terminal
    Completed,
}

/// Progress tracker backed by the `mission_progress` table
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    pool: SqlitePool,
}

impl ProgressTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored percentage, 0 when the user never touched the mission
    pub async fn get_progress(&self, user_id: &str, mission_id: &str) -> Result<u8> {
        let percentage: Option<u8> = sqlx::query_scalar(
            "SELECT percentage FROM mission_progress WHERE user_id = ? AND mission_id = ?",
        )
        .bind(user_id)
        .bind(mission_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(percentage.unwrap_or(0))
    }

    /// Record progress for a (user, mission) pair
    ///
    /// Fails with `InvalidRange` outside 0..=100 and `MissionNotFound` for an
    /// unknown mission. A value lower than the stored one leaves the stored
    /// value in place. Returns the stored percentage.
    pub async fn set_progress(&self, user_id: &str, mission_id: &str, percentage: i64) -> Result<u8> {
        let percentage = validate_percentage(percentage)?;

        let known: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM missions WHERE id = ?)")
            .bind(mission_id)
            .fetch_one(&self.pool)
            .await?;
        if !known {
            return Err(Error::MissionNotFound(mission_id.to_string()));
        }

        let mut conn = self.pool.acquire().await?;
        let stored = record_progress(&mut conn, user_id, mission_id, percentage, time::now()).await?;
        debug!(
            "Progress {}/{}: requested {} stored {}",
            user_id, mission_id, percentage, stored
        );
        Ok(stored)
    }

    /// All recorded progress for a user, keyed by mission id
    pub async fn progress_for_user(&self, user_id: &str) -> Result<HashMap<String, u8>> {
        let rows: Vec<(String, u8)> = sqlx::query_as(
            "SELECT mission_id, percentage FROM mission_progress WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Derive the state machine position for a (user, mission) pair
    pub async fn state(&self, user_id: &str, mission_id: &str) -> Result<MissionState> {
        let completed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM mission_completions WHERE user_id = ? AND mission_id = ?)",
        )
        .bind(user_id)
        .bind(mission_id)
        .fetch_one(&self.pool)
        .await?;

        if completed {
            return Ok(MissionState::Completed);
        }

        Ok(match self.get_progress(user_id, mission_id).await? {
            0 => MissionState::NotStarted,
            _ => MissionState::InProgress,
        })
    }
}

fn validate_percentage(percentage: i64) -> Result<u8> {
    if !(0..=100).contains(&percentage) {
        return Err(Error::InvalidRange(percentage));
    }
    Ok(percentage as u8)
}

/// Monotonic upsert on an existing connection (or open transaction)
pub(crate) async fn record_progress(
    conn: &mut SqliteConnection,
    user_id: &str,
    mission_id: &str,
    percentage: u8,
    at: DateTime<Utc>,
) -> Result<u8> {
    let stored: u8 = sqlx::query_scalar(
        r#"
        INSERT INTO mission_progress (user_id, mission_id, percentage, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, mission_id) DO UPDATE SET
            percentage = MAX(percentage, excluded.percentage),
            updated_at = excluded.updated_at
        RETURNING percentage
        "#,
    )
    .bind(user_id)
    .bind(mission_id)
    .bind(percentage)
    .bind(at)
    .fetch_one(conn)
    .await?;

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_percentage_bounds() {
        assert_eq!(validate_percentage(0).unwrap(), 0);
        assert_eq!(validate_percentage(100).unwrap(), 100);
        assert!(matches!(validate_percentage(-1), Err(Error::InvalidRange(-1))));
        assert!(matches!(validate_percentage(101), Err(Error::InvalidRange(101))));
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&MissionState::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
