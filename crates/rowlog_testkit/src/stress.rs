//! Concurrent write stress for hosts built on the engine.
//!
//! Writers hammer an [`InMemoryStore`] from several threads. Every write
//! carries a unique `(writer, seq)` payload, so each successful update
//! must consume exactly one version; lost updates show up as a version
//! total lower than the number of updates.

use rowlog_codec::Value;
use rowlog_core::{InMemoryStore, RecordId};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of writer threads.
    pub threads: usize,
    /// Writes issued by each thread.
    pub writes_per_thread: usize,
    /// Number of distinct records written to.
    pub records: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            writes_per_thread: 250,
            records: 8,
        }
    }
}

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Writes that created a record.
    pub inserts: usize,
    /// Writes that updated an existing record.
    pub updates: usize,
    /// Writes that returned an error.
    pub failed: usize,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl StressResult {
    /// Total writes issued.
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.failed
    }
}

/// Payload written by `writer` on its `seq`th write.
pub fn stress_record(writer: usize, seq: usize) -> Value {
    Value::object([
        ("writer", Value::Integer(i64::try_from(writer).unwrap_or(i64::MAX))),
        ("seq", Value::Integer(i64::try_from(seq).unwrap_or(i64::MAX))),
    ])
}

/// Runs concurrent upserts against `store`, spreading writes over
/// `config.records` ids.
pub fn stress_concurrent_writes(store: &InMemoryStore, config: &StressConfig) -> StressResult {
    let inserts = AtomicUsize::new(0);
    let updates = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let clock = AtomicI64::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for writer in 0..config.threads {
            let (inserts, updates, failed, clock) = (&inserts, &updates, &failed, &clock);
            scope.spawn(move || {
                for seq in 0..config.writes_per_thread {
                    let id = ((writer + seq) % config.records.max(1)) as RecordId;
                    let now = clock.fetch_add(1, Ordering::Relaxed);
                    let actor = i64::try_from(writer).ok();
                    match store.write(id, stress_record(writer, seq), actor, now) {
                        Ok(0) => inserts.fetch_add(1, Ordering::Relaxed),
                        Ok(_) => updates.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressResult {
        inserts: inserts.into_inner(),
        updates: updates.into_inner(),
        failed: failed.into_inner(),
        duration: start.elapsed(),
    }
}

/// Sum of current versions over every record in `store`.
pub fn total_versions(store: &InMemoryStore) -> u64 {
    store
        .ids()
        .into_iter()
        .filter_map(|id| store.version(id))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_update_consumes_one_version() {
        let store = InMemoryStore::new();
        let config = StressConfig {
            threads: 2,
            writes_per_thread: 20,
            records: 3,
        };
        let result = stress_concurrent_writes(&store, &config);
        assert_eq!(result.total(), 40);
        assert_eq!(result.failed, 0);
        assert_eq!(result.inserts, 3);
        assert_eq!(total_versions(&store), result.updates as u64);
    }
}
