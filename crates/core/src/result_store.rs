//! In-memory buffer of terminal task results, keyed by task id.
//!
//! The store is constructed once at startup and shared behind an `Arc`.
//! Reads are destructive: [`ResultStore::take`] removes the result it
//! returns under the same write lock, so a result is delivered at most once
//! even when polls race with each other or with a late duplicate callback.
//!
//! Nothing is persisted. Results that arrive for a task nobody polls are
//! bounded by the [`RetentionPolicy`] (TTL sweep and capacity cap).

use std::collections::HashMap;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::task::{PollOutcome, TaskResult};
use crate::types::{TaskId, Timestamp};

/// Bounds on how long and how many entries the store keeps.
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    /// Results older than this are dropped by [`ResultStore::purge_expired`].
    /// `None` keeps them until polled.
    pub result_ttl: Option<Duration>,
    /// Maximum number of entries (results and tombstones). Inserting a new
    /// task id into a full store evicts the oldest entry. `None` is unbounded.
    pub capacity: Option<usize>,
    /// How long a drained result leaves a `consumed` tombstone behind.
    /// `None` removes the entry outright, so later polls report `pending`.
    pub consumed_retention: Option<Duration>,
}

#[derive(Debug)]
enum Slot {
    Ready(TaskResult),
    Consumed,
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    /// Write time for results, drain time for tombstones.
    stored_at: Timestamp,
}

/// What [`ResultStore::insert`] did besides storing the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// An earlier result (or tombstone) for the same task id was overwritten.
    pub replaced: bool,
    /// Task id evicted to stay within capacity.
    pub evicted: Option<TaskId>,
}

/// Counts removed by a purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub results: usize,
    pub tombstones: usize,
}

impl PurgeStats {
    pub fn total(&self) -> usize {
        self.results + self.tombstones
    }
}

/// Snapshot of the store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Results waiting to be polled.
    pub results: usize,
    /// Consumed tombstones still retained.
    pub tombstones: usize,
}

/// Task-keyed result buffer with drain-on-read semantics.
#[derive(Debug)]
pub struct ResultStore {
    entries: RwLock<HashMap<TaskId, Entry>>,
    policy: RetentionPolicy,
}

impl ResultStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Store a terminal result for `task_id`, overwriting whatever is there.
    pub async fn insert(&self, task_id: TaskId, result: TaskResult) -> InsertOutcome {
        self.insert_at(task_id, result, Utc::now()).await
    }

    async fn insert_at(&self, task_id: TaskId, result: TaskResult, now: Timestamp) -> InsertOutcome {
        let mut entries = self.entries.write().await;
        let mut outcome = InsertOutcome::default();

        if !entries.contains_key(&task_id) {
            if let Some(capacity) = self.policy.capacity {
                if capacity > 0 && entries.len() >= capacity {
                    outcome.evicted = evict_oldest(&mut entries);
                    if let Some(evicted) = &outcome.evicted {
                        tracing::warn!(
                            task_id = %evicted,
                            capacity,
                            "Result store full, evicted oldest entry"
                        );
                    }
                }
            }
        }

        let entry = Entry {
            slot: Slot::Ready(result),
            stored_at: now,
        };
        outcome.replaced = entries.insert(task_id, entry).is_some();
        outcome
    }

    /// Poll `task_id`, removing a ready result in the same critical section.
    pub async fn take(&self, task_id: &str) -> PollOutcome {
        self.take_at(task_id, Utc::now()).await
    }

    async fn take_at(&self, task_id: &str, now: Timestamp) -> PollOutcome {
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.remove(task_id) else {
            return PollOutcome::Pending;
        };

        match entry.slot {
            Slot::Ready(result) => {
                if self.policy.consumed_retention.is_some() {
                    entries.insert(
                        task_id.to_string(),
                        Entry {
                            slot: Slot::Consumed,
                            stored_at: now,
                        },
                    );
                }
                PollOutcome::Ready(result)
            }
            Slot::Consumed => {
                entries.insert(
                    task_id.to_string(),
                    Entry {
                        slot: Slot::Consumed,
                        stored_at: entry.stored_at,
                    },
                );
                PollOutcome::Consumed
            }
        }
    }

    /// Drop results and tombstones that outlived their retention.
    pub async fn purge_expired(&self) -> PurgeStats {
        self.purge_expired_at(Utc::now()).await
    }

    async fn purge_expired_at(&self, now: Timestamp) -> PurgeStats {
        // A TTL reaching back past the earliest representable instant never expires.
        let result_cutoff = self
            .policy
            .result_ttl
            .and_then(|ttl| now.checked_sub_signed(ttl));
        let tombstone_cutoff = self
            .policy
            .consumed_retention
            .and_then(|ttl| now.checked_sub_signed(ttl));

        let mut stats = PurgeStats::default();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| {
            let cutoff = match entry.slot {
                Slot::Ready(_) => result_cutoff,
                Slot::Consumed => tombstone_cutoff,
            };
            let expired = cutoff.is_some_and(|cutoff| entry.stored_at < cutoff);
            if expired {
                match entry.slot {
                    Slot::Ready(_) => stats.results += 1,
                    Slot::Consumed => stats.tombstones += 1,
                }
            }
            !expired
        });
        stats
    }

    pub async fn stats(&self) -> StoreStats {
        let entries = self.entries.read().await;
        let tombstones = entries
            .values()
            .filter(|e| matches!(e.slot, Slot::Consumed))
            .count();
        StoreStats {
            results: entries.len() - tombstones,
            tombstones,
        }
    }

    /// Total number of entries, tombstones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

/// Remove the entry with the earliest `stored_at`. Ties break on task id so
/// eviction order is deterministic.
fn evict_oldest(entries: &mut HashMap<TaskId, Entry>) -> Option<TaskId> {
    let oldest = entries
        .iter()
        .min_by(|(a_id, a), (b_id, b)| a.stored_at.cmp(&b.stored_at).then_with(|| a_id.cmp(b_id)))
        .map(|(id, _)| id.clone())?;
    entries.remove(&oldest);
    Some(oldest)
}
