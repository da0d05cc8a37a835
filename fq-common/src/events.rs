//! Event types for the FarmQuest event system
//!
//! Provides shared event definitions and the EventBus used to fan
//! gamification events out to notification consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// FarmQuest event types
///
/// Serializable so consumers can forward them verbatim (e.g. as push
/// notifications).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FqEvent {
    /// Sample missions were written into an empty catalog
    CatalogSeeded {
        /// Number of missions actually inserted
        missions_inserted: u64,
        timestamp: DateTime<Utc>,
    },

    /// A user completed a mission for the first time
    MissionCompleted {
        completion_id: Uuid,
        user_id: String,
        mission_id: String,
        points_awarded: i64,
        /// Cumulative points after the credit
        total_points: i64,
        timestamp: DateTime<Utc>,
    },

    /// A user earned a badge
    BadgeEarned {
        user_id: String,
        badge_id: String,
        mission_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A user's level increased
    LevelUp {
        user_id: String,
        old_level: u32,
        new_level: u32,
        timestamp: DateTime<Utc>,
    },

    /// Ranking was replaced from completion facts
    LeaderboardRebuilt {
        users: usize,
        /// Users whose ranked score disagreed with their completions
        mismatches: usize,
        timestamp: DateTime<Utc>,
    },
}

impl FqEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            FqEvent::CatalogSeeded { .. } => "CatalogSeeded",
            FqEvent::MissionCompleted { .. } => "MissionCompleted",
            FqEvent::BadgeEarned { .. } => "BadgeEarned",
            FqEvent::LevelUp { .. } => "LevelUp",
            FqEvent::LeaderboardRebuilt { .. } => "LeaderboardRebuilt",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: every subscriber receives every event
/// emitted after it subscribed; slow subscribers lose the oldest events once
/// `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FqEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use fq_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FqEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: FqEvent) -> Result<usize, broadcast::error::SendError<FqEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FqEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> FqEvent {
        FqEvent::BadgeEarned {
            user_id: "u1".to_string(),
            badge_id: "compost_master".to_string(),
            mission_id: "mission_001".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(sample_event()).is_err());
        // Lossy emit tolerates the same situation
        bus.emit_lossy(sample_event());
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.emit(sample_event()).unwrap(), 2);
        assert_eq!(rx1.try_recv().unwrap().event_type(), "BadgeEarned");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "BadgeEarned");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "BadgeEarned");
        assert_eq!(json["badge_id"], "compost_master");

        let back: FqEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "BadgeEarned");
    }
}
