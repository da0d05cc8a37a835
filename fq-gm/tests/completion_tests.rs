//! Mission completion workflow tests
//!
//! Covers the first-completion award, idempotent repeats, badge and level
//! bookkeeping and the failure cases that must leave no state behind.

mod helpers;

use fq_common::events::FqEvent;
use fq_gm::catalog::{Difficulty, Mission};
use fq_gm::{achievements, completion};
use fq_gm::progress::MissionState;
use fq_gm::Error;
use serde_json::json;

#[tokio::test]
async fn test_first_completion_awards_points_and_badge() {
    let store = helpers::setup().await;

    let response = store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();

    assert!(response.success);
    assert!(!response.already_completed);
    assert_eq!(response.points_awarded, 500);
    assert_eq!(response.badges_earned, vec!["compost_master".to_string()]);
    assert_eq!(response.total_points, 500);
    assert_eq!(response.new_level, 1);
    assert!(!response.level_up);

    let board = store.service.get_leaderboard(None, 0).await.unwrap();
    assert_eq!(board.leaderboard.len(), 1);
    assert_eq!(board.leaderboard[0].rank, 1);
    assert_eq!(board.leaderboard[0].user_id, "u1");
    assert_eq!(board.leaderboard[0].points, 500);

    let badges = store.service.get_user_badges("u1").await.unwrap();
    assert_eq!(badges.badges.len(), 1);
    assert_eq!(badges.badges[0].id, "compost_master");
    assert_eq!(badges.badges[0].points, 500);
}

#[tokio::test]
async fn test_repeat_completion_is_idempotent() {
    let store = helpers::setup().await;

    let first = store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();
    let second = store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();

    assert!(second.already_completed);
    assert_eq!(second.points_awarded, 500);
    assert_eq!(second.completion_id, first.completion_id);
    assert_eq!(second.badges_earned, first.badges_earned);
    assert_eq!(second.total_points, 500);

    assert_eq!(store.service.leaderboard().score("u1").await, Some(500));
    assert_eq!(completion::count(&store.pool).await.unwrap(), 1);
    assert_eq!(store.service.get_user_badges("u1").await.unwrap().badges.len(), 1);
}

#[tokio::test]
async fn test_completion_sets_progress_and_state() {
    let store = helpers::setup().await;
    store
        .service
        .update_progress("u1", "mission_002", 40)
        .await
        .unwrap();

    store
        .service
        .complete_mission("mission_002", "u1", None)
        .await
        .unwrap();

    let progress = store.service.progress();
    assert_eq!(progress.get_progress("u1", "mission_002").await.unwrap(), 100);
    assert_eq!(
        progress.state("u1", "mission_002").await.unwrap(),
        MissionState::Completed
    );
}

#[tokio::test]
async fn test_unknown_mission_fails_without_side_effects() {
    let store = helpers::setup().await;

    let result = store
        .service
        .complete_mission("mission_999", "u1", None)
        .await;

    assert!(matches!(result, Err(Error::MissionNotFound(ref id)) if id == "mission_999"));
    assert_eq!(completion::count(&store.pool).await.unwrap(), 0);
    assert!(store.service.leaderboard().is_empty().await);
}

#[tokio::test]
async fn test_inactive_mission_cannot_be_completed() {
    let store = helpers::setup().await;
    store
        .service
        .catalog()
        .set_active("mission_003", false)
        .await
        .unwrap();

    let result = store
        .service
        .complete_mission("mission_003", "u1", None)
        .await;

    assert!(matches!(result, Err(Error::MissionNotFound(_))));
}

#[tokio::test]
async fn test_empty_user_is_rejected() {
    let store = helpers::setup().await;

    let result = store.service.complete_mission("mission_001", "  ", None).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(completion::count(&store.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_evidence_is_stored_with_completion() {
    let store = helpers::setup().await;
    let evidence = json!({ "photo": "compost.jpg", "notes": "three bins" });

    store
        .service
        .complete_mission("mission_001", "u1", Some(evidence.clone()))
        .await
        .unwrap();

    let fact = completion::find(&store.pool, "u1", "mission_001")
        .await
        .unwrap()
        .expect("completion recorded");
    assert_eq!(fact.evidence, Some(evidence));
    assert_eq!(fact.points_awarded, 500);
    assert_eq!(fact.badge_id.as_deref(), Some("compost_master"));
}

#[tokio::test]
async fn test_level_up_crossing_threshold() {
    let store = helpers::setup().await;

    store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();
    let response = store
        .service
        .complete_mission("mission_002", "u1", None)
        .await
        .unwrap();

    assert_eq!(response.total_points, 1300);
    assert!(response.level_up);
    assert_eq!(response.new_level, 2);
}

#[tokio::test]
async fn test_events_emitted_for_first_completion_only() {
    let store = helpers::setup().await;
    let mut rx = store.service.subscribe();

    store
        .service
        .complete_mission("mission_003", "u1", None)
        .await
        .unwrap();

    let completed = rx.try_recv().unwrap();
    match completed {
        FqEvent::MissionCompleted {
            user_id,
            mission_id,
            points_awarded,
            total_points,
            ..
        } => {
            assert_eq!(user_id, "u1");
            assert_eq!(mission_id, "mission_003");
            assert_eq!(points_awarded, 1200);
            assert_eq!(total_points, 1200);
        }
        other => panic!("unexpected event {:?}", other),
    }

    let badge = rx.try_recv().unwrap();
    assert!(matches!(badge, FqEvent::BadgeEarned { ref badge_id, .. } if badge_id == "organic_master"));

    let level = rx.try_recv().unwrap();
    assert!(matches!(
        level,
        FqEvent::LevelUp {
            old_level: 1,
            new_level: 2,
            ..
        }
    ));

    store
        .service
        .complete_mission("mission_003", "u1", None)
        .await
        .unwrap();
    assert!(rx.try_recv().is_err(), "repeat completion must not emit events");
}

#[tokio::test]
async fn test_shared_badge_awarded_once() {
    let store = helpers::setup().await;
    let bonus = Mission::new("mission_101", "Second Compost Pit", 300, Difficulty::Easy)
        .with_reward_badge("compost_master");
    assert!(store.service.catalog().publish(&bonus).await.unwrap());

    store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();
    let response = store
        .service
        .complete_mission("mission_101", "u1", None)
        .await
        .unwrap();

    assert!(response.badges_earned.is_empty());
    assert_eq!(response.total_points, 800);
    assert_eq!(store.service.get_user_badges("u1").await.unwrap().badges.len(), 1);
    assert_eq!(achievements::count_for_user(&store.pool, "u1").await.unwrap(), 1);

    let fact = completion::find(&store.pool, "u1", "mission_101")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fact.badge_id, None);
}

#[tokio::test]
async fn test_list_for_user_in_completion_order() {
    let store = helpers::setup().await;
    for mission in ["mission_002", "mission_001"] {
        store
            .service
            .complete_mission(mission, "u1", None)
            .await
            .unwrap();
    }
    store
        .service
        .complete_mission("mission_001", "u2", None)
        .await
        .unwrap();

    let facts = completion::list_for_user(&store.pool, "u1").await.unwrap();
    let missions: Vec<&str> = facts.iter().map(|c| c.mission_id.as_str()).collect();
    assert_eq!(missions, vec!["mission_002", "mission_001"]);
}

#[tokio::test]
async fn test_repeat_completion_restores_missing_credit() {
    let store = helpers::setup().await;
    store
        .service
        .complete_mission("mission_001", "u1", None)
        .await
        .unwrap();
    store
        .service
        .complete_mission("mission_002", "u1", None)
        .await
        .unwrap();

    // Ranking lost the second credit while the fact stayed committed
    store.service.leaderboard().credit("u1", -800).await;

    let response = store
        .service
        .complete_mission("mission_002", "u1", None)
        .await
        .unwrap();

    assert!(response.already_completed);
    assert_eq!(response.total_points, 1300);
    assert_eq!(response.new_level, 2);
    assert_eq!(store.service.leaderboard().score("u1").await, Some(1300));
    assert!(store
        .service
        .reconcile_leaderboard()
        .await
        .unwrap()
        .mismatches
        .is_empty());
}

#[tokio::test]
async fn test_total_for_user_sums_facts() {
    let store = helpers::setup().await;
    for mission in ["mission_001", "mission_003"] {
        store
            .service
            .complete_mission(mission, "u1", None)
            .await
            .unwrap();
    }

    assert_eq!(completion::total_for_user(&store.pool, "u1").await.unwrap(), 1700);
    assert_eq!(completion::total_for_user(&store.pool, "nobody").await.unwrap(), 0);
}
