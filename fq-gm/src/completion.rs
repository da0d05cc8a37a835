//! Mission completion workflow
//!
//! State per (user, mission): `NotStarted -> InProgress -> Completed`, with
//! `Completed` terminal. The `UNIQUE (user_id, mission_id)` constraint on
//! `mission_completions` is the compare-and-swap: of any number of concurrent
//! `complete` calls for one key, exactly one `INSERT OR IGNORE` affects a
//! row, and only that caller credits points.
//!
//! The completion fact, the progress bump and the achievement are written in
//! one transaction. Points are credited to the in-memory ranking only after
//! that transaction commits; the ranking is rebuilt from committed facts on
//! startup, so a credit can never exist without its fact or vice versa.

use crate::catalog::MissionCatalog;
use crate::error::{Error, Result};
use crate::leaderboard::Leaderboard;
use crate::levels::LevelPolicy;
use crate::progress::record_progress;
use chrono::{DateTime, Utc};
use fq_common::events::{EventBus, FqEvent};
use fq_common::time;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Immutable record of a first completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub completion_id: Uuid,
    pub user_id: String,
    pub mission_id: String,
    pub points_awarded: i64,
    /// Badge newly earned by this completion
    pub badge_id: Option<String>,
    pub evidence: Option<Value>,
    pub completed_at: DateTime<Utc>,
}

/// What a `complete` call produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub completion_id: Uuid,
    pub points_awarded: i64,
    pub badges_earned: Vec<String>,
    pub level_up: bool,
    pub new_level: u32,
    /// User's cumulative points after this call
    pub total_points: i64,
    /// The mission was already completed; nothing was credited
    pub already_completed: bool,
}

/// A user whose ranked score disagrees with their completion facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMismatch {
    pub user_id: String,
    pub ranked: i64,
    pub recorded: i64,
}

/// Result of comparing the ranking with completion facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub users_checked: usize,
    pub mismatches: Vec<ScoreMismatch>,
    pub rebuilt: bool,
}

type CompletionRow = (
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

const COMPLETION_COLUMNS: &str =
    "completion_id, user_id, mission_id, points_awarded, badge_id, evidence, completed_at";

fn completion_from_row(row: CompletionRow) -> Result<Completion> {
    let (completion_id, user_id, mission_id, points_awarded, badge_id, evidence, completed_at) = row;
    let completion_id = Uuid::parse_str(&completion_id)
        .map_err(|e| Error::Internal(format!("bad completion id {}: {}", completion_id, e)))?;
    let evidence = evidence
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()?;

    Ok(Completion {
        completion_id,
        user_id,
        mission_id,
        points_awarded,
        badge_id,
        evidence,
        completed_at,
    })
}

/// Completion fact for a (user, mission) pair, if any
pub async fn find(pool: &SqlitePool, user_id: &str, mission_id: &str) -> Result<Option<Completion>> {
    let sql = format!(
        "SELECT {} FROM mission_completions WHERE user_id = ? AND mission_id = ?",
        COMPLETION_COLUMNS
    );
    let row: Option<CompletionRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(mission_id)
        .fetch_optional(pool)
        .await?;

    row.map(completion_from_row).transpose()
}

/// All completions of a user, oldest first
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Completion>> {
    let sql = format!(
        "SELECT {} FROM mission_completions WHERE user_id = ? ORDER BY seq",
        COMPLETION_COLUMNS
    );
    let rows: Vec<CompletionRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(completion_from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mission_completions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Sum of awarded points for one user, 0 when they completed nothing
pub async fn total_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_awarded), 0) FROM mission_completions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Sum of awarded points per user, in order of each user's first completion
pub async fn totals_by_user(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT user_id, SUM(points_awarded) AS total
        FROM mission_completions
        GROUP BY user_id
        ORDER BY MIN(seq)
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Coordinates catalog, progress, completion facts and the ranking
#[derive(Debug, Clone)]
pub struct CompletionWorkflow {
    pool: SqlitePool,
    catalog: MissionCatalog,
    leaderboard: Arc<Leaderboard>,
    events: EventBus,
    levels: LevelPolicy,
    /// Completions hold it shared from insert until credit. Rebuilds and
    /// repeat lookups hold it exclusively so they never observe a committed
    /// but uncredited fact.
    credit_gate: Arc<RwLock<()>>,
}

impl CompletionWorkflow {
    pub fn new(
        pool: SqlitePool,
        catalog: MissionCatalog,
        leaderboard: Arc<Leaderboard>,
        events: EventBus,
        levels: LevelPolicy,
    ) -> Self {
        Self {
            pool,
            catalog,
            leaderboard,
            events,
            levels,
            credit_gate: Arc::new(RwLock::new(())),
        }
    }

    pub fn levels(&self) -> LevelPolicy {
        self.levels
    }

    /// Complete a mission for a user
    ///
    /// Idempotent: once completed, further calls return the original award
    /// with `already_completed = true` and credit nothing new.
    ///
    /// The work runs on its own task, so a caller that stops waiting (for
    /// example on a deadline) cannot leave a committed completion uncredited.
    pub async fn complete(
        &self,
        user_id: &str,
        mission_id: &str,
        evidence: Option<Value>,
    ) -> Result<CompletionOutcome> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }

        let workflow = self.clone();
        let user_id = user_id.to_string();
        let mission_id = mission_id.to_string();
        tokio::spawn(async move { workflow.complete_detached(&user_id, &mission_id, evidence).await })
            .await
            .map_err(|e| Error::Internal(format!("completion task failed: {}", e)))?
    }

    async fn complete_detached(
        &self,
        user_id: &str,
        mission_id: &str,
        evidence: Option<Value>,
    ) -> Result<CompletionOutcome> {
        let mission = self.catalog.get_active(mission_id).await?;

        if let Some(existing) = find(&self.pool, user_id, mission_id).await? {
            debug!("Mission {} already completed by {}", mission_id, user_id);
            return self.cached_outcome(existing).await;
        }

        let completion_id = Uuid::new_v4();
        let now = time::now();
        let points = i64::from(mission.points);
        let evidence_json = evidence.as_ref().map(serde_json::to_string).transpose()?;

        let gate = self.credit_gate.read().await;
        let mut tx = self.pool.begin().await?;

        // The insert is the first statement so the write lock is taken before
        // anything is read inside the transaction.
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO mission_completions
                (completion_id, user_id, mission_id, points_awarded, evidence, completed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(completion_id.to_string())
        .bind(user_id)
        .bind(mission_id)
        .bind(points)
        .bind(evidence_json.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            drop(gate);
            debug!("Lost completion race for {}/{}", user_id, mission_id);
            let existing = find(&self.pool, user_id, mission_id).await?.ok_or_else(|| {
                Error::Internal(format!(
                    "completion {}/{} vanished after conflict",
                    user_id, mission_id
                ))
            })?;
            return self.cached_outcome(existing).await;
        }

        record_progress(&mut *tx, user_id, mission_id, 100, now).await?;

        let mut badges_earned = Vec::new();
        if let Some(badge_id) = &mission.reward_badge {
            let earned = sqlx::query(
                r#"
                INSERT OR IGNORE INTO achievements (user_id, badge_id, mission_id, points, earned_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(badge_id)
            .bind(mission_id)
            .bind(points)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if earned > 0 {
                sqlx::query("UPDATE mission_completions SET badge_id = ? WHERE completion_id = ?")
                    .bind(badge_id)
                    .bind(completion_id.to_string())
                    .execute(&mut *tx)
                    .await?;
                badges_earned.push(badge_id.clone());
            }
        }

        tx.commit().await?;

        let change = self.leaderboard.credit(user_id, points).await;
        drop(gate);

        let (level_up, new_level) = self.levels.progress(change.old_score, change.new_score);

        info!(
            "{} completed {} (+{} points, total {})",
            user_id, mission_id, points, change.new_score
        );

        self.events.emit_lossy(FqEvent::MissionCompleted {
            completion_id,
            user_id: user_id.to_string(),
            mission_id: mission_id.to_string(),
            points_awarded: points,
            total_points: change.new_score,
            timestamp: now,
        });
        for badge_id in &badges_earned {
            self.events.emit_lossy(FqEvent::BadgeEarned {
                user_id: user_id.to_string(),
                badge_id: badge_id.clone(),
                mission_id: mission_id.to_string(),
                timestamp: now,
            });
        }
        if level_up {
            self.events.emit_lossy(FqEvent::LevelUp {
                user_id: user_id.to_string(),
                old_level: self.levels.level_for(change.old_score),
                new_level,
                timestamp: now,
            });
        }

        Ok(CompletionOutcome {
            completion_id,
            points_awarded: points,
            badges_earned,
            level_up,
            new_level,
            total_points: change.new_score,
            already_completed: false,
        })
    }

    /// Outcome for an already-completed pair
    ///
    /// Taken under the exclusive gate so any in-flight credit has landed.
    /// The total comes from completion facts; a ranked score that fell short
    /// of them is topped up here.
    async fn cached_outcome(&self, existing: Completion) -> Result<CompletionOutcome> {
        let _gate = self.credit_gate.write().await;

        let recorded = total_for_user(&self.pool, &existing.user_id).await?;
        let ranked = self.leaderboard.score(&existing.user_id).await.unwrap_or(0);
        if ranked < recorded {
            warn!(
                "Crediting {} missing point(s) to {}",
                recorded - ranked,
                existing.user_id
            );
            self.leaderboard
                .credit(&existing.user_id, recorded - ranked)
                .await;
        }

        Ok(CompletionOutcome {
            completion_id: existing.completion_id,
            points_awarded: existing.points_awarded,
            badges_earned: existing.badge_id.into_iter().collect(),
            level_up: false,
            new_level: self.levels.level_for(recorded),
            total_points: recorded,
            already_completed: true,
        })
    }

    /// Load the ranking from completion facts, replacing whatever it holds
    pub async fn rebuild_leaderboard(&self) -> Result<usize> {
        let _gate = self.credit_gate.write().await;
        let totals = totals_by_user(&self.pool).await?;
        let users = totals.len();
        self.leaderboard.rebuild(totals).await;
        info!("Leaderboard rebuilt from completions ({} users)", users);
        Ok(users)
    }

    /// Check the sum invariant for every user; rebuild the ranking if it fails
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let _gate = self.credit_gate.write().await;

        let totals = totals_by_user(&self.pool).await?;
        let mut ranked: HashMap<String, i64> =
            self.leaderboard.snapshot().await.into_iter().collect();

        let mut mismatches = Vec::new();
        for (user_id, recorded) in &totals {
            let ranked_score = ranked.remove(user_id).unwrap_or(0);
            if ranked_score != *recorded {
                mismatches.push(ScoreMismatch {
                    user_id: user_id.clone(),
                    ranked: ranked_score,
                    recorded: *recorded,
                });
            }
        }
        // Ranked users with no completion facts at all
        for (user_id, ranked_score) in ranked {
            mismatches.push(ScoreMismatch {
                user_id,
                ranked: ranked_score,
                recorded: 0,
            });
        }
        mismatches.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let users_checked = totals.len();
        let rebuilt = !mismatches.is_empty();
        if rebuilt {
            warn!(
                "Leaderboard drifted for {} user(s); rebuilding from completions",
                mismatches.len()
            );
            self.leaderboard.rebuild(totals).await;
            self.events.emit_lossy(FqEvent::LeaderboardRebuilt {
                users: users_checked,
                mismatches: mismatches.len(),
                timestamp: time::now(),
            });
        } else {
            debug!("Leaderboard consistent for {} user(s)", users_checked);
        }

        Ok(ReconcileReport {
            users_checked,
            mismatches,
            rebuilt,
        })
    }
}
