//! Concurrent writers on the in-memory reference store.

use rowlog_codec::Value;
use rowlog_core::reconstruct::replay;
use rowlog_core::{log, CaptureConfig, History, InMemoryStore, RetentionPolicy};
use rowlog_testkit::prelude::*;
use std::thread;

fn assert_histories_consistent(store: &InMemoryStore) {
    for id in store.ids() {
        let stored = store.stored(id).unwrap();
        let log = log::decode(&stored.log).unwrap();
        if log.is_empty() {
            continue;
        }
        let states = replay(&log).unwrap();
        let (version, last) = states.last().unwrap();
        assert_eq!(*version, log.current_version());
        assert_eq!(last, &stored.record, "record {id} diverged from its history");
    }
}

#[test]
fn shared_records_never_lose_versions() {
    let store = InMemoryStore::new();
    let config = StressConfig {
        threads: 8,
        writes_per_thread: 100,
        records: 2,
    };
    let result = stress_concurrent_writes(&store, &config);

    assert_eq!(result.failed, 0);
    assert_eq!(result.total(), 800);
    assert_eq!(result.inserts, 2);
    assert_eq!(total_versions(&store), result.updates as u64);
    assert_histories_consistent(&store);
}

#[test]
fn distinct_records_are_independent() {
    let store = InMemoryStore::new();
    thread::scope(|scope| {
        for writer in 0..4u64 {
            let store = &store;
            scope.spawn(move || {
                for seq in 0..50i64 {
                    let record = Value::object([("seq", Value::from(seq))]);
                    store.write(writer, record, None, seq).unwrap();
                }
            });
        }
    });

    for id in 0..4 {
        assert_eq!(store.version(id), Some(49));
        let history = History::new(&store);
        assert_eq!(
            history.get_version(&id, 10).unwrap(),
            Value::object([("seq", Value::from(10))])
        );
    }
    assert_histories_consistent(&store);
}

#[test]
fn bounded_logs_stay_bounded_under_contention() {
    let config = CaptureConfig::new().retention(RetentionPolicy::new().max_entries(5));
    let store = InMemoryStore::with_config(config).unwrap();
    let result = stress_concurrent_writes(
        &store,
        &StressConfig {
            threads: 4,
            writes_per_thread: 50,
            records: 3,
        },
    );

    assert_eq!(result.failed, 0);
    assert_eq!(total_versions(&store), result.updates as u64);
    for id in store.ids() {
        let log = log::decode(&store.stored(id).unwrap().log).unwrap();
        assert!(log.len() <= 5);
    }
    assert_histories_consistent(&store);
}

#[test]
fn deletes_race_with_writes_without_corruption() {
    let store = InMemoryStore::new();
    thread::scope(|scope| {
        let store = &store;
        scope.spawn(move || {
            for seq in 0..200i64 {
                let _ = store.write(1, Value::object([("seq", Value::from(seq))]), None, seq);
            }
        });
        scope.spawn(move || {
            for _ in 0..50 {
                store.delete(1);
                thread::yield_now();
            }
        });
    });
    assert_histories_consistent(&store);
}
