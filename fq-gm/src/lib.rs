//! fq-gm - FarmQuest gamification store
//!
//! Mission catalog, per-user progress, idempotent mission completion and the
//! live point leaderboard. Durable facts live in SQLite; the ranking is an
//! in-memory sorted structure rebuilt from those facts on open.

pub mod achievements;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod levels;
pub mod progress;
pub mod service;
pub mod types;

pub use error::{Error, ErrorResponse, Result};
pub use service::GamificationService;
