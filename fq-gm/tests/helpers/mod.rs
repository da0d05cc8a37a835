//! Shared fixtures for fq-gm integration tests

#![allow(dead_code)]

use fq_common::db::init::init_database;
use fq_common::events::EventBus;
use fq_gm::GamificationService;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Service over a throwaway database; the directory lives as long as this
pub struct TestStore {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub events: EventBus,
    pub service: GamificationService,
}

impl TestStore {
    /// Open a second service on the same database (simulated restart)
    pub async fn reopen(&self) -> GamificationService {
        GamificationService::open(self.pool.clone(), EventBus::new(16))
            .await
            .unwrap()
    }
}

pub async fn test_pool(dir: &TempDir) -> SqlitePool {
    init_database(&dir.path().join("farmquest.db")).await.unwrap()
}

/// Fresh database with the sample catalog seeded
pub async fn setup() -> TestStore {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    let events = EventBus::new(64);
    let service = GamificationService::open(pool.clone(), events.clone())
        .await
        .unwrap();

    TestStore {
        dir,
        pool,
        events,
        service,
    }
}
