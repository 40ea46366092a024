use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::error::StoreError;
use crate::models::{CounterKey, CounterRecord, DomainStat};
use crate::snapshot;

/// Storage seam for the per-bucket domain counters.
///
/// `upsert` must be atomic per (timestamp, name) key: two concurrent calls for
/// the same key both land in the final count. Range queries may observe
/// in-flight upserts partially.
pub trait CounterStore: Send + Sync {
    // Add `delta` to the counter for (timestamp, name), creating it on first sight
    fn upsert(&self, timestamp: i64, name: &str, delta: u64) -> Result<(), StoreError>;

    fn get(&self, timestamp: i64, name: &str) -> Option<CounterRecord>;

    // Sum per name over [from, to), highest first, ties by name, at most `n` rows
    fn top_n_by_range(&self, from: i64, to: i64, n: usize) -> Result<Vec<DomainStat>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Persist whatever is buffered, no-op for volatile stores
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// In-memory counter store with an optional JSON snapshot on disk
pub struct MemoryStore {
    records: DashMap<CounterKey, CounterRecord>,
    // timestamp -> names seen in that bucket, used for range scans
    index: RwLock<BTreeMap<i64, BTreeSet<String>>>,
    next_id: AtomicU64,
    snapshot_path: Option<PathBuf>,
    flush_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            index: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            snapshot_path: None,
            flush_lock: Mutex::new(()),
        }
    }

    // Load the snapshot at `path` (if any) and flush back to it later
    pub fn open(path: Option<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        if let Some(path) = path {
            let records = snapshot::load(&path)?;
            store.restore(records)?;
            store.snapshot_path = Some(path);
        }
        Ok(store)
    }

    fn restore(&self, records: Vec<CounterRecord>) -> Result<(), StoreError> {
        let mut max_id = 0;
        for record in records {
            max_id = max_id.max(record.id);
            match self.records.entry(record.key()) {
                // duplicate rows in a hand-edited snapshot are merged
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.requests =
                        existing.requests.checked_add(record.requests).ok_or_else(|| {
                            StoreError::Constraint(format!(
                                "request counter overflow restoring {} at {}",
                                record.name, record.timestamp
                            ))
                        })?;
                }
                Entry::Vacant(entry) => {
                    let (timestamp, name) = (record.timestamp, record.name.clone());
                    entry.insert(record);
                    self.index_insert(timestamp, name);
                }
            }
        }
        let next_id = max_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Constraint("record ids exhausted".to_string()))?;
        self.next_id.store(next_id, Ordering::Relaxed);
        Ok(())
    }

    fn index_insert(&self, timestamp: i64, name: String) {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        index.entry(timestamp).or_default().insert(name);
    }

    fn keys_in_range(&self, from: i64, to: i64) -> Vec<CounterKey> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index
            .range(from..to)
            .flat_map(|(timestamp, names)| {
                names
                    .iter()
                    .map(move |name| CounterKey::new(*timestamp, name.clone()))
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryStore {
    fn upsert(&self, timestamp: i64, name: &str, delta: u64) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::Constraint("domain name must not be empty".to_string()));
        }

        // the entry guard holds the shard lock for the whole read-modify-write
        let created = match self.records.entry(CounterKey::new(timestamp, name)) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.requests = record.requests.checked_add(delta).ok_or_else(|| {
                    StoreError::Constraint(format!(
                        "request counter overflow for {name} at {timestamp}"
                    ))
                })?;
                false
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                entry.insert(CounterRecord {
                    id,
                    timestamp,
                    name: name.to_string(),
                    requests: delta,
                });
                true
            }
        };

        // index is updated after the shard lock is released
        if created {
            self.index_insert(timestamp, name.to_string());
        }
        Ok(())
    }

    fn get(&self, timestamp: i64, name: &str) -> Option<CounterRecord> {
        self.records
            .get(&CounterKey::new(timestamp, name))
            .map(|record| record.value().clone())
    }

    fn top_n_by_range(
        &self,
        from: i64,
        to: i64,
        n: usize,
    ) -> Result<Vec<DomainStat>, StoreError> {
        if n == 0 || from >= to {
            return Ok(Vec::new());
        }

        let mut totals: HashMap<String, u64> = HashMap::new();
        for key in self.keys_in_range(from, to) {
            if let Some(record) = self.records.get(&key) {
                let total = totals.entry(key.name).or_insert(0);
                *total = total.checked_add(record.requests).ok_or_else(|| {
                    StoreError::Constraint(format!(
                        "request total overflow for {} in [{from}, {to})",
                        record.name
                    ))
                })?;
            }
        }

        let mut ranked: Vec<DomainStat> = totals
            .into_iter()
            .map(|(name, requests)| DomainStat { name, requests })
            .collect();
        ranked.sort_by(|a, b| {
            b.requests
                .cmp(&a.requests)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(n);
        Ok(ranked)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut records: Vec<CounterRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        snapshot::save(path, &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn stat(name: &str, requests: u64) -> DomainStat {
        DomainStat {
            name: name.to_string(),
            requests,
        }
    }

    #[test]
    fn repeated_upserts_accumulate_into_one_record() {
        let store = MemoryStore::new();
        for delta in [3, 0, 4, 10] {
            store.upsert(100, "a.com", delta).unwrap();
        }

        assert_eq!(store.len(), 1);
        let record = store.get(100, "a.com").unwrap();
        assert_eq!(record.requests, 17);
        assert_eq!(record.id, 1);
    }

    #[test]
    fn missing_record_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(100, "a.com").is_none());

        store.upsert(100, "a.com", 1).unwrap();
        assert!(store.get(101, "a.com").is_none());
        assert!(store.get(100, "A.com").is_none());
    }

    #[test]
    fn ids_are_assigned_once_per_key() {
        let store = MemoryStore::new();
        store.upsert(1, "a.com", 1).unwrap();
        store.upsert(1, "b.com", 1).unwrap();
        store.upsert(1, "a.com", 1).unwrap();
        store.upsert(2, "a.com", 1).unwrap();

        assert_eq!(store.get(1, "a.com").unwrap().id, 1);
        assert_eq!(store.get(1, "b.com").unwrap().id, 2);
        assert_eq!(store.get(2, "a.com").unwrap().id, 3);
    }

    #[test]
    fn empty_name_is_rejected() {
        let store = MemoryStore::new();
        let err = store.upsert(1, "", 5).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn overflow_leaves_counter_untouched() {
        let store = MemoryStore::new();
        store.upsert(1, "a.com", u64::MAX - 1).unwrap();
        assert!(store.upsert(1, "a.com", 2).is_err());
        assert_eq!(store.get(1, "a.com").unwrap().requests, u64::MAX - 1);
    }

    #[test]
    fn concurrent_upserts_on_one_key_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        store.upsert(42, "hot.com", 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(42, "hot.com").unwrap().requests, 8_000);
    }

    #[test]
    fn two_racing_deltas_sum() {
        let store = Arc::new(MemoryStore::new());
        thread::scope(|scope| {
            scope.spawn(|| store.upsert(7, "a.com", 5).unwrap());
            scope.spawn(|| store.upsert(7, "a.com", 11).unwrap());
        });
        assert_eq!(store.get(7, "a.com").unwrap().requests, 16);
    }

    #[test]
    fn range_is_half_open() {
        let store = MemoryStore::new();
        store.upsert(99, "before.com", 1).unwrap();
        store.upsert(100, "from.com", 1).unwrap();
        store.upsert(159, "inside.com", 1).unwrap();
        store.upsert(160, "to.com", 1).unwrap();

        let names: Vec<String> = store
            .top_n_by_range(100, 160, 10)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["from.com", "inside.com"]);
    }

    #[test]
    fn sums_across_buckets_and_orders_by_count_then_name() {
        let store = MemoryStore::new();
        store.upsert(10, "a.com", 5).unwrap();
        store.upsert(10, "c.com", 4).unwrap();
        store.upsert(11, "c.com", 5).unwrap();
        store.upsert(12, "b.com", 9).unwrap();

        let expected = vec![stat("b.com", 9), stat("c.com", 9), stat("a.com", 5)];
        assert_eq!(store.top_n_by_range(0, 100, 10).unwrap(), expected);
        // repeated calls give the same order
        assert_eq!(store.top_n_by_range(0, 100, 10).unwrap(), expected);
    }

    #[test]
    fn limit_truncates_ranking() {
        let store = MemoryStore::new();
        for i in 0..15u64 {
            store.upsert(5, &format!("d{i:02}.com"), i + 1).unwrap();
        }

        let top = store.top_n_by_range(0, 10, 10).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], stat("d14.com", 15));
        assert_eq!(top[9], stat("d05.com", 6));
    }

    #[test]
    fn empty_and_inverted_ranges_return_nothing() {
        let store = MemoryStore::new();
        store.upsert(50, "a.com", 1).unwrap();

        assert!(store.top_n_by_range(0, 50, 10).unwrap().is_empty());
        assert!(store.top_n_by_range(50, 50, 10).unwrap().is_empty());
        assert!(store.top_n_by_range(60, 10, 10).unwrap().is_empty());
        assert!(store.top_n_by_range(0, 100, 0).unwrap().is_empty());
    }

    #[test]
    fn flush_and_reopen_keeps_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");

        let store = MemoryStore::open(Some(path.clone())).unwrap();
        assert!(store.is_empty());
        store.upsert(1, "a.com", 3).unwrap();
        store.upsert(1, "b.com", 7).unwrap();
        store.flush().unwrap();

        let reopened = MemoryStore::open(Some(path)).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(1, "b.com").unwrap().requests, 7);
        assert_eq!(
            reopened.top_n_by_range(0, 2, 10).unwrap(),
            vec![stat("b.com", 7), stat("a.com", 3)]
        );

        // new keys continue after the restored ids
        reopened.upsert(2, "c.com", 1).unwrap();
        assert_eq!(reopened.get(2, "c.com").unwrap().id, 3);
    }

    #[test]
    fn restore_merges_duplicate_rows() {
        let store = MemoryStore::new();
        store.restore(vec![
            CounterRecord {
                id: 4,
                timestamp: 1,
                name: "a.com".to_string(),
                requests: 2,
            },
            CounterRecord {
                id: 9,
                timestamp: 1,
                name: "a.com".to_string(),
                requests: 3,
            },
        ])
        .unwrap();

        assert_eq!(store.len(), 1);
        let record = store.get(1, "a.com").unwrap();
        assert_eq!(record.requests, 5);
        assert_eq!(record.id, 4);

        store.upsert(2, "b.com", 1).unwrap();
        assert_eq!(store.get(2, "b.com").unwrap().id, 10);
    }

    #[test]
    fn overflowing_duplicate_rows_fail_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let row = |id, requests| CounterRecord {
            id,
            timestamp: 1,
            name: "a.com".to_string(),
            requests,
        };
        snapshot::save(&path, &[row(1, u64::MAX - 1), row(2, 5)]).unwrap();

        let err = MemoryStore::open(Some(path)).err().unwrap();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn exhausted_ids_fail_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let row = CounterRecord {
            id: u64::MAX,
            timestamp: 1,
            name: "a.com".to_string(),
            requests: 1,
        };
        snapshot::save(&path, &[row]).unwrap();

        let err = MemoryStore::open(Some(path)).err().unwrap();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn overflowing_range_total_is_an_error() {
        let store = MemoryStore::new();
        store.upsert(1, "a.com", u64::MAX).unwrap();
        store.upsert(2, "a.com", 5).unwrap();

        let err = store.top_n_by_range(0, 10, 10).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        // each bucket on its own still sums fine
        assert_eq!(store.top_n_by_range(2, 3, 10).unwrap(), vec![stat("a.com", 5)]);
    }

    #[test]
    fn volatile_store_flush_is_noop() {
        let store = MemoryStore::new();
        store.upsert(1, "a.com", 1).unwrap();
        assert!(store.flush().is_ok());
    }
}
