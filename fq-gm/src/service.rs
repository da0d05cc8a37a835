//! Gamification service boundary
//!
//! Owns the injected pool, ranking and event bus and exposes the operations
//! callers use. Opening the service loads settings, optionally seeds the
//! catalog and rebuilds the ranking from completion facts.

use crate::achievements;
use crate::catalog::MissionCatalog;
use crate::completion::{self, CompletionWorkflow, ReconcileReport};
use crate::config::GamificationSettings;
use crate::error::{Error, Result};
use crate::leaderboard::Leaderboard;
use crate::levels::LevelPolicy;
use crate::progress::ProgressTracker;
use crate::types::{
    AchievementsResponse, BadgesResponse, CompletionResponse, LeaderboardEntry,
    LeaderboardResponse, MissionStats, MissionView, MissionsResponse, ProgressResponse,
    UserLeaderboardEntry, UserLeaderboardResponse,
};
use fq_common::events::{EventBus, FqEvent};
use fq_common::time;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Entry point for all gamification operations
#[derive(Debug, Clone)]
pub struct GamificationService {
    pool: SqlitePool,
    settings: GamificationSettings,
    catalog: MissionCatalog,
    progress: ProgressTracker,
    leaderboard: Arc<Leaderboard>,
    workflow: CompletionWorkflow,
    events: EventBus,
}

impl GamificationService {
    /// Open the service on an initialized database
    pub async fn open(pool: SqlitePool, events: EventBus) -> Result<Self> {
        let settings = GamificationSettings::load(&pool).await?;
        Self::with_settings(pool, events, settings).await
    }

    /// Open with explicit settings instead of the `settings` table
    pub async fn with_settings(
        pool: SqlitePool,
        events: EventBus,
        settings: GamificationSettings,
    ) -> Result<Self> {
        let catalog = MissionCatalog::new(pool.clone());
        let progress = ProgressTracker::new(pool.clone());
        let leaderboard = Arc::new(Leaderboard::new());
        let workflow = CompletionWorkflow::new(
            pool.clone(),
            catalog.clone(),
            Arc::clone(&leaderboard),
            events.clone(),
            LevelPolicy::new(settings.points_per_level),
        );

        let service = Self {
            pool,
            settings,
            catalog,
            progress,
            leaderboard,
            workflow,
            events,
        };

        if settings.seed_catalog_on_start {
            service.seed_catalog().await?;
        }
        service.workflow.rebuild_leaderboard().await?;

        info!("Gamification service ready");
        Ok(service)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &GamificationSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &MissionCatalog {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.leaderboard
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FqEvent> {
        self.events.subscribe()
    }

    /// Seed the sample catalog if it is empty; returns missions inserted
    pub async fn seed_catalog(&self) -> Result<u64> {
        let inserted = self.catalog.ensure_seeded().await?;
        if inserted > 0 {
            self.events.emit_lossy(FqEvent::CatalogSeeded {
                missions_inserted: inserted,
                timestamp: time::now(),
            });
        }
        Ok(inserted)
    }

    /// Active missions, merged with the user's progress when a user is given
    pub async fn list_missions(
        &self,
        user_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<MissionsResponse> {
        let limit = limit.unwrap_or(self.settings.mission_list_default_limit);
        let missions = self.catalog.list_active(limit).await?;

        let (progress, completed) = match user_id {
            Some(user_id) => {
                let progress = self.progress.progress_for_user(user_id).await?;
                let completed: HashSet<String> = completion::list_for_user(&self.pool, user_id)
                    .await?
                    .into_iter()
                    .map(|c| c.mission_id)
                    .collect();
                (progress, completed)
            }
            None => Default::default(),
        };

        let missions = missions
            .into_iter()
            .map(|mission| {
                let pct = progress.get(&mission.id).copied().unwrap_or(0);
                let done = completed.contains(&mission.id);
                MissionView::new(mission, pct, done)
            })
            .collect();

        Ok(MissionsResponse { missions })
    }

    /// Complete a mission; repeat calls are idempotent
    pub async fn complete_mission(
        &self,
        mission_id: &str,
        user_id: &str,
        evidence: Option<Value>,
    ) -> Result<CompletionResponse> {
        let outcome = self.workflow.complete(user_id, mission_id, evidence).await?;
        Ok(outcome.into())
    }

    pub async fn get_leaderboard(&self, limit: Option<u64>, offset: u64) -> Result<LeaderboardResponse> {
        let limit = limit.unwrap_or(self.settings.leaderboard_default_limit);
        let leaderboard = self
            .leaderboard
            .top_n(offset, limit)
            .await
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect();

        Ok(LeaderboardResponse {
            leaderboard,
            offset,
            limit,
        })
    }

    /// Leaderboard page with each user's level and profile placeholders
    pub async fn get_leaderboard_with_users(
        &self,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<UserLeaderboardResponse> {
        let limit = limit.unwrap_or(self.settings.leaderboard_default_limit);
        let levels = self.workflow.levels();
        let leaderboard = self
            .leaderboard
            .top_n(offset, limit)
            .await
            .into_iter()
            .map(|entry| UserLeaderboardEntry::new(entry, &levels))
            .collect();

        Ok(UserLeaderboardResponse {
            leaderboard,
            offset,
            limit,
        })
    }

    /// Every badge the user has earned, newest first
    pub async fn get_user_badges(&self, user_id: &str) -> Result<BadgesResponse> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        let earned = achievements::count_for_user(&self.pool, user_id).await?;
        let limit = u32::try_from(earned).unwrap_or(u32::MAX);
        let badges = achievements::list_for_user(&self.pool, user_id, limit)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(BadgesResponse {
            user_id: user_id.to_string(),
            badges,
        })
    }

    pub async fn get_mission_stats(&self) -> Result<MissionStats> {
        Ok(MissionStats {
            total_missions: self.catalog.count_all().await?,
            active_missions: self.catalog.count_active().await?,
            total_completions: completion::count(&self.pool).await?,
        })
    }

    pub async fn get_recent_achievements(&self, limit: Option<u32>) -> Result<AchievementsResponse> {
        let limit = limit.unwrap_or(self.settings.recent_achievements_default_limit);
        let achievements = achievements::recent(&self.pool, limit).await?;
        Ok(AchievementsResponse { achievements })
    }

    /// Record progress short of completion
    pub async fn update_progress(
        &self,
        user_id: &str,
        mission_id: &str,
        percentage: i64,
    ) -> Result<ProgressResponse> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        let progress = self.progress.set_progress(user_id, mission_id, percentage).await?;
        let state = self.progress.state(user_id, mission_id).await?;

        Ok(ProgressResponse {
            user_id: user_id.to_string(),
            mission_id: mission_id.to_string(),
            progress,
            state,
        })
    }

    /// Verify ranked scores against completion facts, repairing drift
    pub async fn reconcile_leaderboard(&self) -> Result<ReconcileReport> {
        self.workflow.reconcile().await
    }
}
