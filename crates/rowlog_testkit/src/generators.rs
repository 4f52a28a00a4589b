//! Property-based test generators using proptest.
//!
//! Records are drawn from a small key universe so that consecutive writes
//! overlap and produce a realistic mix of `set` and `remove` operations
//! instead of wholesale replacement.

use proptest::prelude::*;
use rowlog_codec::Value;
use rowlog_core::{Path, PathToken, Record, RetentionPolicy};
use std::time::Duration;

const FIELDS: &[&str] = &["name", "email", "tags", "address", "city", "n", "meta", "ssn"];

/// Strategy for map keys, drawn from a fixed set of field names.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS).prop_map(str::to_string)
}

/// Strategy for scalar values. Never produces the redaction marker.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::Integer),
        any::<i64>().prop_map(Value::Integer),
        "[a-z]{0,8}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for arbitrary nested values: scalars, lists, text-keyed maps
/// and the occasional integer-keyed map.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            3 => prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            4 => prop::collection::vec((key_strategy(), inner.clone()), 0..5)
                .prop_map(|pairs| Value::object(pairs)),
            1 => prop::collection::vec((any::<i8>(), inner), 0..3).prop_map(|pairs| {
                Value::map(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (Value::Integer(i64::from(k)), v))
                        .collect(),
                )
            }),
        ]
    })
}

/// Strategy for records: text-keyed maps of arbitrary values.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::vec((key_strategy(), value_strategy()), 0..6)
        .prop_map(|pairs| Value::object(pairs))
}

/// Strategy for a sequence of record states, roughly one in five repeating
/// its predecessor so no-op writes are exercised.
pub fn write_sequence_strategy(
    min_writes: usize,
    max_writes: usize,
) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(
        (record_strategy(), prop::bool::weighted(0.2)),
        min_writes..max_writes,
    )
    .prop_map(|items| {
        let mut states: Vec<Record> = Vec::with_capacity(items.len());
        for (record, repeat) in items {
            let next = match states.last() {
                Some(previous) if repeat => previous.clone(),
                _ => record,
            };
            states.push(next);
        }
        states
    })
}

/// Strategy for key-only paths one to three levels deep.
pub fn path_strategy() -> impl Strategy<Value = Path> {
    prop::collection::vec(key_strategy(), 1..4)
        .prop_map(|keys| Path::new(keys.into_iter().map(PathToken::Key).collect()))
}

/// Strategy for valid retention policies.
pub fn retention_policy_strategy() -> impl Strategy<Value = RetentionPolicy> {
    (
        prop::option::of(1u32..8),
        prop::option::of((0u64..5_000).prop_map(Duration::from_millis)),
        prop::option::of(16usize..2_048),
        prop::collection::btree_set(path_strategy(), 0..3),
        any::<bool>(),
    )
        .prop_map(
            |(max_entries, max_age, max_bytes, redact_paths, keep_baseline)| RetentionPolicy {
                max_entries,
                max_age,
                max_bytes,
                redact_paths,
                keep_baseline,
            },
        )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
