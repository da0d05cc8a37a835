//! Leaderboard consistency tests
//!
//! The ranked score of every user must equal the sum of that user's
//! completion points: after normal use, after a restart, and after drift has
//! been repaired by reconciliation.

mod helpers;

use fq_common::events::FqEvent;
use fq_gm::completion;

async fn complete_all(store: &helpers::TestStore, pairs: &[(&str, &str)]) {
    for (user, mission) in pairs {
        store
            .service
            .complete_mission(mission, user, None)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_scores_sorted_descending() {
    let store = helpers::setup().await;
    complete_all(
        &store,
        &[
            ("alice", "mission_001"),
            ("bob", "mission_003"),
            ("carol", "mission_002"),
            ("alice", "mission_002"),
        ],
    )
    .await;

    let board = store.service.get_leaderboard(None, 0).await.unwrap();
    let rows: Vec<(&str, i64)> = board
        .leaderboard
        .iter()
        .map(|e| (e.user_id.as_str(), e.points))
        .collect();
    assert_eq!(rows, vec![("alice", 1300), ("bob", 1200), ("carol", 800)]);

    for pair in board.leaderboard.windows(2) {
        assert!(pair[0].points >= pair[1].points);
        assert_eq!(pair[1].rank, pair[0].rank + 1);
    }
}

#[tokio::test]
async fn test_ties_keep_first_completion_order() {
    let store = helpers::setup().await;
    complete_all(&store, &[("zoe", "mission_001"), ("adam", "mission_001")]).await;

    let board = store.service.get_leaderboard(None, 0).await.unwrap();
    assert_eq!(board.leaderboard[0].user_id, "zoe");
    assert_eq!(board.leaderboard[1].user_id, "adam");
    assert_eq!(board.leaderboard[0].points, board.leaderboard[1].points);
}

#[tokio::test]
async fn test_pagination_and_default_limit() {
    let store = helpers::setup().await;
    complete_all(
        &store,
        &[("a", "mission_003"), ("b", "mission_002"), ("c", "mission_001")],
    )
    .await;

    let page = store.service.get_leaderboard(Some(1), 1).await.unwrap();
    assert_eq!(page.offset, 1);
    assert_eq!(page.limit, 1);
    assert_eq!(page.leaderboard.len(), 1);
    assert_eq!(page.leaderboard[0].rank, 2);
    assert_eq!(page.leaderboard[0].user_id, "b");

    let full = store.service.get_leaderboard(None, 0).await.unwrap();
    assert_eq!(full.limit, 100);
    assert_eq!(full.leaderboard.len(), 3);
}

#[tokio::test]
async fn test_restart_rebuilds_identical_ranking() {
    let store = helpers::setup().await;
    complete_all(
        &store,
        &[
            ("zoe", "mission_001"),
            ("adam", "mission_001"),
            ("mia", "mission_003"),
            ("adam", "mission_002"),
        ],
    )
    .await;
    let before = store.service.get_leaderboard(None, 0).await.unwrap();

    let reopened = store.reopen().await;
    let after = reopened.get_leaderboard(None, 0).await.unwrap();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_sum_invariant_holds_after_normal_use() {
    let store = helpers::setup().await;
    complete_all(
        &store,
        &[
            ("u1", "mission_001"),
            ("u1", "mission_002"),
            ("u2", "mission_003"),
            ("u1", "mission_001"),
        ],
    )
    .await;

    let totals = completion::totals_by_user(&store.pool).await.unwrap();
    for (user, total) in &totals {
        assert_eq!(store.service.leaderboard().score(user).await, Some(*total));
    }

    let report = store.service.reconcile_leaderboard().await.unwrap();
    assert_eq!(report.users_checked, 2);
    assert!(report.mismatches.is_empty());
    assert!(!report.rebuilt);
}

#[tokio::test]
async fn test_reconcile_repairs_drift() {
    let store = helpers::setup().await;
    complete_all(&store, &[("u1", "mission_001"), ("u2", "mission_002")]).await;
    let mut rx = store.service.subscribe();

    // Simulate a stray credit that has no completion fact behind it
    store.service.leaderboard().credit("u1", 250).await;
    store.service.leaderboard().credit("ghost", 40).await;

    let report = store.service.reconcile_leaderboard().await.unwrap();

    assert!(report.rebuilt);
    assert_eq!(report.mismatches.len(), 2);
    let u1 = report
        .mismatches
        .iter()
        .find(|m| m.user_id == "u1")
        .unwrap();
    assert_eq!((u1.ranked, u1.recorded), (750, 500));

    assert_eq!(store.service.leaderboard().score("u1").await, Some(500));
    assert_eq!(store.service.leaderboard().score("ghost").await, None);
    assert!(matches!(
        rx.try_recv().unwrap(),
        FqEvent::LeaderboardRebuilt {
            users: 2,
            mismatches: 2,
            ..
        }
    ));

    let again = store.service.reconcile_leaderboard().await.unwrap();
    assert!(!again.rebuilt);
}

#[tokio::test]
async fn test_leaderboard_with_users_shows_levels() {
    let store = helpers::setup().await;
    complete_all(
        &store,
        &[
            ("alice", "mission_001"),
            ("alice", "mission_002"),
            ("alice", "mission_003"),
            ("bob", "mission_001"),
        ],
    )
    .await;

    let board = store
        .service
        .get_leaderboard_with_users(None, 0)
        .await
        .unwrap();

    assert_eq!(board.limit, 100);
    let rows: Vec<(u64, &str, i64, u32)> = board
        .leaderboard
        .iter()
        .map(|e| (e.rank, e.user_id.as_str(), e.points, e.level))
        .collect();
    assert_eq!(rows, vec![(1, "alice", 2500, 3), (2, "bob", 500, 1)]);
    assert_eq!(board.leaderboard[1].name, "User bob");

    let page = store
        .service
        .get_leaderboard_with_users(Some(1), 1)
        .await
        .unwrap();
    assert_eq!(page.leaderboard.len(), 1);
    assert_eq!(page.leaderboard[0].rank, 2);
}
