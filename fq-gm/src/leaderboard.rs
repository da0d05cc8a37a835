//! Live point ranking
//!
//! In-memory sorted structure: a `HashMap` index from user to rank key plus a
//! `BTreeSet` of rank keys ordered by score descending, then by the order in
//! which each user was first credited. Both live behind one
//! `tokio::sync::RwLock`, so a credit is a single atomic remove/insert and a
//! read copies its slice under a short read lock.
//!
//! Not durable: rebuilt from completion facts at startup (see
//! [`crate::completion::totals_by_user`]).

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// One row of a leaderboard page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based position
    pub rank: u64,
    pub user_id: String,
    pub score: i64,
}

/// Result of a credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankChange {
    /// Score before the credit (0 for a new entry)
    pub old_score: i64,
    pub new_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    score: Reverse<i64>,
    /// First-credit order; stable tie breaker
    seq: u64,
    user_id: String,
}

#[derive(Debug, Default)]
struct Ranking {
    index: HashMap<String, RankKey>,
    order: BTreeSet<RankKey>,
    next_seq: u64,
}

impl Ranking {
    fn credit(&mut self, user_id: &str, delta: i64) -> RankChange {
        let (old_score, seq) = match self.index.get(user_id) {
            Some(key) => {
                self.order.remove(key);
                (key.score.0, key.seq)
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                (0, seq)
            }
        };

        let new_score = old_score.saturating_add(delta);
        let key = RankKey {
            score: Reverse(new_score),
            seq,
            user_id: user_id.to_string(),
        };
        self.order.insert(key.clone());
        self.index.insert(user_id.to_string(), key);

        RankChange {
            old_score,
            new_score,
        }
    }
}

/// Thread-safe ranking shared by all request handlers
#[derive(Debug, Default)]
pub struct Leaderboard {
    inner: RwLock<Ranking>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to a user's score, creating the entry if absent
    pub async fn credit(&self, user_id: &str, delta: i64) -> RankChange {
        self.inner.write().await.credit(user_id, delta)
    }

    /// Page of the ranking, best first
    pub async fn top_n(&self, offset: u64, limit: u64) -> Vec<RankedEntry> {
        let ranking = self.inner.read().await;
        ranking
            .order
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .enumerate()
            .map(|(i, key)| RankedEntry {
                rank: offset + i as u64 + 1,
                user_id: key.user_id.clone(),
                score: key.score.0,
            })
            .collect()
    }

    pub async fn score(&self, user_id: &str) -> Option<i64> {
        self.inner
            .read()
            .await
            .index
            .get(user_id)
            .map(|key| key.score.0)
    }

    /// 1-based rank of a user, `None` if never credited
    pub async fn rank_of(&self, user_id: &str) -> Option<u64> {
        let ranking = self.inner.read().await;
        let key = ranking.index.get(user_id)?;
        Some(ranking.order.range(..key).count() as u64 + 1)
    }

    /// Every (user, score) pair, best first
    pub async fn snapshot(&self) -> Vec<(String, i64)> {
        self.inner
            .read()
            .await
            .order
            .iter()
            .map(|key| (key.user_id.clone(), key.score.0))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replace the whole ranking
    ///
    /// `totals` order becomes the tie-break order, so callers pass users in
    /// order of their first credit.
    pub async fn rebuild<I>(&self, totals: I)
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut fresh = Ranking::default();
        for (user_id, total) in totals {
            fresh.credit(&user_id, total);
        }
        *self.inner.write().await = fresh;
    }
}
