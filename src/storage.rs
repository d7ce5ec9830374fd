//! In-Memory Journal Storage (C2)
//!
//! A thread-safe map from journal ID to `Journal`, generalizing the
//! teacher's `search_service.rs` `Arc<Mutex<HashMap<..>>>` cache into a
//! reader/writer discipline (`std::sync::RwLock`) so concurrent readers
//! never block each other, per spec §4.2/§5.
//!
//! The interface is deliberately narrow so a durable backend can replace it
//! without touching the Handler or Worker (spec §9).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::error::AppError;
use crate::types::{Journal, ProcessingStatus};

/// Aggregate statistics over all stored journals.
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub total_journals: usize,
    pub completed_count: usize,
    pub avg_processing_time_ms: f64,
    pub oldest_age_human: String,
    pub newest_age_human: String,
}

#[derive(Clone)]
pub struct Storage {
    inner: Arc<RwLock<HashMap<String, Journal>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a journal by ID. Sets `created_at`/`timestamp` if
    /// this is the first store for this ID; always refreshes `updated_at`.
    /// Never fails for well-formed input.
    pub fn store(&self, mut journal: Journal) -> Journal {
        let now = Utc::now();
        let mut map = self.inner.write().expect("storage lock poisoned");

        if let Some(existing) = map.get(&journal.id) {
            journal.created_at = existing.created_at;
            journal.timestamp = existing.timestamp;
        } else {
            // First store for this id: created_at and updated_at must match
            // exactly, so both take the same `now` regardless of whatever
            // the caller pre-populated on the journal. `timestamp` is
            // authored-at and is pinned alongside `created_at`.
            journal.created_at = now;
            journal.timestamp = now;
        }
        journal.updated_at = now;

        map.insert(journal.id.clone(), journal.clone());
        journal
    }

    pub fn get(&self, id: &str) -> Result<Journal, AppError> {
        let map = self.inner.read().expect("storage lock poisoned");
        map.get(id).cloned().ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Returns a consistent snapshot; callers never observe a
    /// partially-mutated journal.
    pub fn get_all(&self) -> Vec<Journal> {
        let map = self.inner.read().expect("storage lock poisoned");
        map.values().cloned().collect()
    }

    /// Fails with `NotFound` if absent; preserves `created_at`/`timestamp`,
    /// refreshes `updated_at`, forces `id` to match the lookup key.
    pub fn update(&self, id: &str, mut journal: Journal) -> Result<Journal, AppError> {
        let mut map = self.inner.write().expect("storage lock poisoned");
        let existing = map.get(id).ok_or_else(|| AppError::NotFound(id.to_string()))?;

        journal.id = id.to_string();
        journal.created_at = existing.created_at;
        journal.timestamp = existing.timestamp;
        journal.updated_at = Utc::now();

        map.insert(id.to_string(), journal.clone());
        Ok(journal)
    }

    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut map = self.inner.write().expect("storage lock poisoned");
        map.remove(id).map(|_| ()).ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    pub fn count(&self) -> usize {
        let map = self.inner.read().expect("storage lock poisoned");
        map.len()
    }

    /// Aggregates on read. A durable backend would maintain these counters
    /// incrementally instead (spec §9).
    pub fn get_stats(&self) -> StorageStats {
        let map = self.inner.read().expect("storage lock poisoned");
        let total_journals = map.len();

        let mut completed_count = 0usize;
        let mut total_processing_ms: u128 = 0;
        let mut oldest: Option<chrono::DateTime<Utc>> = None;
        let mut newest: Option<chrono::DateTime<Utc>> = None;

        for journal in map.values() {
            if let Some(result) = &journal.processing_result {
                if result.status == ProcessingStatus::Completed {
                    completed_count += 1;
                    total_processing_ms += result.processing_time_ms as u128;
                }
            }
            oldest = Some(oldest.map_or(journal.created_at, |o| o.min(journal.created_at)));
            newest = Some(newest.map_or(journal.created_at, |n| n.max(journal.created_at)));
        }

        let avg_processing_time_ms = if completed_count > 0 {
            total_processing_ms as f64 / completed_count as f64
        } else {
            0.0
        };

        let now = Utc::now();
        let age_human = |ts: Option<chrono::DateTime<Utc>>| -> String {
            match ts {
                Some(t) => format_age((now - t).num_seconds().max(0)),
                None => "n/a".to_string(),
            }
        };

        StorageStats {
            total_journals,
            completed_count,
            avg_processing_time_ms,
            oldest_age_human: age_human(oldest),
            newest_age_human: age_human(newest),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

fn format_age(seconds: i64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcessingResult;

    fn sample_journal(id: &str) -> Journal {
        Journal {
            id: id.to_string(),
            content: "hello".to_string(),
            timestamp: chrono::DateTime::<Utc>::default(),
            created_at: chrono::DateTime::<Utc>::default(),
            updated_at: chrono::DateTime::<Utc>::default(),
            metadata: None,
            processing_result: None,
        }
    }

    #[test]
    fn store_sets_created_at_on_first_insert() {
        let storage = Storage::new();
        let stored = storage.store(sample_journal("a"));
        assert!(stored.created_at <= stored.updated_at);
        assert_ne!(stored.created_at, chrono::DateTime::<Utc>::default());
    }

    #[test]
    fn store_preserves_created_at_on_replace() {
        let storage = Storage::new();
        let first = storage.store(sample_journal("a"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut second = sample_journal("a");
        second.content = "updated".to_string();
        let stored_again = storage.store(second);
        assert_eq!(stored_again.created_at, first.created_at);
        assert!(stored_again.updated_at > first.updated_at);
    }

    #[test]
    fn get_missing_returns_not_found() {
        let storage = Storage::new();
        let err = storage.get("missing").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn update_missing_returns_not_found() {
        let storage = Storage::new();
        let err = storage.update("missing", sample_journal("missing")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn get_stats_total_matches_count() {
        let storage = Storage::new();
        storage.store(sample_journal("a"));
        storage.store(sample_journal("b"));
        assert_eq!(storage.get_stats().total_journals, storage.count());
    }

    #[test]
    fn get_stats_averages_only_completed() {
        let storage = Storage::new();
        let mut j = sample_journal("a");
        j.processing_result = Some(ProcessingResult {
            status: ProcessingStatus::Completed,
            sentiment_result: None,
            processed_at: Utc::now(),
            processing_time_ms: 100,
            error: None,
        });
        storage.store(j);

        let mut failed = sample_journal("b");
        failed.processing_result = Some(ProcessingResult {
            status: ProcessingStatus::Failed,
            sentiment_result: None,
            processed_at: Utc::now(),
            processing_time_ms: 999,
            error: Some("boom".to_string()),
        });
        storage.store(failed);

        let stats = storage.get_stats();
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.avg_processing_time_ms, 100.0);
    }

    #[test]
    fn delete_removes_journal() {
        let storage = Storage::new();
        storage.store(sample_journal("a"));
        storage.delete("a").unwrap();
        assert!(storage.get("a").is_err());
    }
}
