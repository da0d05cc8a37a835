//! Timestamp utilities
//!
//! Every timestamp the store persists (`completed_at`, `earned_at`,
//! `updated_at`) comes from [`now`] and is stored as RFC 3339 text, which
//! sorts chronologically.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
