//! Boundary response types
//!
//! Everything returned by [`crate::GamificationService`] serializes to
//! snake_case JSON.

use crate::achievements::EarnedBadge;
use crate::catalog::{Difficulty, Mission, Rarity};
use crate::completion::CompletionOutcome;
use crate::leaderboard::RankedEntry;
use crate::levels::LevelPolicy;
use crate::progress::MissionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRewards {
    pub points: u32,
    pub badge: Option<String>,
}

/// A mission as seen by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: u32,
    pub difficulty: Difficulty,
    pub estimated_time: String,
    pub time_remaining: String,
    pub category: String,
    pub rewards: MissionRewards,
    /// Caller's progress, 0 for anonymous listings
    pub progress: u8,
    pub state: MissionState,
}

impl MissionView {
    pub fn new(mission: Mission, progress: u8, completed: bool) -> Self {
        let state = if completed {
            MissionState::Completed
        } else if progress > 0 {
            MissionState::InProgress
        } else {
            MissionState::NotStarted
        };

        Self {
            rewards: MissionRewards {
                points: mission.points,
                badge: mission.reward_badge,
            },
            id: mission.id,
            title: mission.title,
            description: mission.description,
            icon: mission.icon,
            points: mission.points,
            difficulty: mission.difficulty,
            estimated_time: mission.estimated_time,
            time_remaining: mission.time_remaining,
            category: mission.category,
            progress,
            state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionsResponse {
    pub missions: Vec<MissionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub success: bool,
    pub completion_id: Uuid,
    pub points_awarded: i64,
    pub badges_earned: Vec<String>,
    pub level_up: bool,
    pub new_level: u32,
    pub total_points: i64,
    pub already_completed: bool,
}

impl From<CompletionOutcome> for CompletionResponse {
    fn from(outcome: CompletionOutcome) -> Self {
        Self {
            success: true,
            completion_id: outcome.completion_id,
            points_awarded: outcome.points_awarded,
            badges_earned: outcome.badges_earned,
            level_up: outcome.level_up,
            new_level: outcome.new_level,
            total_points: outcome.total_points,
            already_completed: outcome.already_completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: String,
    pub points: i64,
}

impl From<RankedEntry> for LeaderboardEntry {
    fn from(entry: RankedEntry) -> Self {
        Self {
            rank: entry.rank,
            user_id: entry.user_id,
            points: entry.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub offset: u64,
    pub limit: u64,
}

/// Leaderboard row with the user's level and display placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeaderboardEntry {
    pub rank: u64,
    pub user_id: String,
    /// Placeholder until profiles are resolved by a user service
    pub name: String,
    pub points: i64,
    pub level: u32,
    pub avatar: String,
}

impl UserLeaderboardEntry {
    pub fn new(entry: RankedEntry, levels: &LevelPolicy) -> Self {
        Self {
            name: format!("User {}", entry.user_id),
            level: levels.level_for(entry.score),
            avatar: "👨‍🌾".to_string(),
            rank: entry.rank,
            user_id: entry.user_id,
            points: entry.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeaderboardResponse {
    pub leaderboard: Vec<UserLeaderboardEntry>,
    pub offset: u64,
    pub limit: u64,
}

/// A badge in a user's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i64,
    pub earned_at: DateTime<Utc>,
    pub rarity: Rarity,
}

impl From<EarnedBadge> for UserBadge {
    fn from(badge: EarnedBadge) -> Self {
        Self {
            id: badge.id,
            title: badge.title,
            description: badge.description,
            icon: badge.icon,
            points: badge.points,
            earned_at: badge.earned_at,
            rarity: badge.rarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgesResponse {
    pub user_id: String,
    pub badges: Vec<UserBadge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementsResponse {
    pub achievements: Vec<EarnedBadge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStats {
    pub total_missions: i64,
    pub active_missions: i64,
    pub total_completions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub user_id: String,
    pub mission_id: String,
    pub progress: u8,
    pub state: MissionState,
}
