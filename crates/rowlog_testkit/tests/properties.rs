//! Engine laws, checked over generated write sequences.

use proptest::prelude::*;
use rowlog_codec::Value;
use rowlog_core::{
    capture, compact, compact_with_stats, diff, log, reconstruct_version, CaptureConfig,
    CaptureInput, Path, RetentionPolicy, REDACTED,
};
use rowlog_testkit::prelude::*;

fn strip(mut record: Value, path: &Path) -> Value {
    path.remove_from(&mut record);
    record
}

/// `value` with the pairs of every map in reverse order.
fn reverse_maps(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(reverse_maps).collect()),
        Value::Map(pairs) => Value::Map(
            pairs
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), reverse_maps(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn diff_of_identical_records_is_empty(record in record_strategy()) {
        prop_assert!(diff(&record, &record).is_empty());
    }

    #[test]
    fn applying_a_diff_yields_the_new_record(
        old in record_strategy(),
        new in record_strategy(),
    ) {
        let patch = diff(&old, &new);
        prop_assert_eq!(patch.is_empty(), old == new);
        let mut state = old.clone();
        patch.apply(&mut state).unwrap();
        prop_assert_eq!(state, new);
    }

    #[test]
    fn diff_is_deterministic(old in record_strategy(), new in record_strategy()) {
        prop_assert_eq!(diff(&old, &new), diff(&old, &new));
    }

    #[test]
    fn log_roundtrips(states in write_sequence_strategy(1, 12)) {
        let timeline = Timeline::record(&states, &CaptureConfig::default());
        let decoded = timeline.log();
        if timeline.bytes.is_empty() {
            prop_assert!(decoded.is_empty());
        } else {
            prop_assert_eq!(log::encode(&decoded), timeline.bytes.clone());
            prop_assert_eq!(log::encoded_len(&decoded), timeline.bytes.len());
        }
        prop_assert_eq!(log::decode(&log::encode(&decoded)).unwrap(), decoded);
    }

    #[test]
    fn every_version_reconstructs(states in write_sequence_strategy(2, 12)) {
        let timeline = Timeline::record(&states, &CaptureConfig::default());
        let log = timeline.log();
        prop_assume!(!log.is_empty());
        for (state, version) in timeline.states.iter().zip(&timeline.versions) {
            prop_assert_eq!(&reconstruct_version(&log, *version).unwrap(), state);
        }
    }

    #[test]
    fn versions_grow_by_one_per_change(states in write_sequence_strategy(2, 12)) {
        let timeline = Timeline::record(&states, &CaptureConfig::default());
        for i in 1..timeline.states.len() {
            let step = timeline.versions[i] - timeline.versions[i - 1];
            let changed = timeline.states[i] != timeline.states[i - 1];
            prop_assert_eq!(step, u64::from(changed));
        }
    }

    #[test]
    fn no_op_capture_keeps_bytes(
        states in write_sequence_strategy(1, 8),
        extra in record_strategy(),
    ) {
        let timeline = Timeline::record(&states, &CaptureConfig::default());
        let current = timeline.current().clone();
        let input = CaptureInput::new(&current, &current, 1_000).existing_log(&timeline.bytes);
        prop_assert_eq!(capture(&input, &CaptureConfig::default()).unwrap(), timeline.bytes.clone());

        // An actual change still goes through.
        prop_assume!(extra != current);
        let input = CaptureInput::new(&current, &extra, 1_000).existing_log(&timeline.bytes);
        let after = log::decode(&capture(&input, &CaptureConfig::default()).unwrap()).unwrap();
        prop_assert_eq!(after.current_version(), timeline.log().current_version() + 1);
    }

    #[test]
    fn map_order_of_snapshots_does_not_matter(
        old in record_strategy(),
        new in record_strategy(),
    ) {
        let config = CaptureConfig::default();
        let sorted = capture(&CaptureInput::new(&old, &new, 1), &config).unwrap();
        let (old_rev, new_rev) = (reverse_maps(&old), reverse_maps(&new));
        let reversed = capture(&CaptureInput::new(&old_rev, &new_rev, 1), &config).unwrap();
        prop_assert_eq!(&reversed, &sorted);
        if !sorted.is_empty() {
            prop_assert_eq!(log::encode(&log::decode(&sorted).unwrap()), sorted);
        }
    }

    #[test]
    fn compaction_respects_entry_bound_and_is_idempotent(
        states in write_sequence_strategy(2, 16),
        policy in retention_policy_strategy(),
    ) {
        let log = Timeline::record(&states, &CaptureConfig::default()).log();
        let once = compact(&log, &policy).unwrap();
        if let Some(max) = policy.max_entries {
            prop_assert!(once.len() <= max as usize);
        }
        prop_assert_eq!(once.current_version(), log.current_version());
        prop_assert_eq!(once.is_empty(), log.is_empty());
        let (twice, stats) = compact_with_stats(&once, &policy).unwrap();
        prop_assert_eq!(&twice, &once);
        prop_assert!(!stats.changed());
    }

    #[test]
    fn retained_versions_survive_compaction(
        states in write_sequence_strategy(2, 16),
        max_entries in 1u32..6,
    ) {
        let timeline = Timeline::record(&states, &CaptureConfig::default());
        let policy = RetentionPolicy::new().max_entries(max_entries);
        let compacted = compact(&timeline.log(), &policy).unwrap();
        let Some(oldest) = compacted.oldest_version() else {
            return Ok(());
        };
        for (state, version) in timeline.states.iter().zip(&timeline.versions) {
            if *version + 1 >= oldest {
                prop_assert_eq!(&reconstruct_version(&compacted, *version).unwrap(), state);
            } else {
                prop_assert!(reconstruct_version(&compacted, *version).unwrap_err().is_truncation());
            }
        }
    }

    #[test]
    fn redaction_only_touches_the_redacted_path(
        states in write_sequence_strategy(2, 12),
        path in path_strategy(),
    ) {
        let log = Timeline::record(&states, &CaptureConfig::default()).log();
        prop_assume!(!log.is_empty());
        let redacted = compact(&log, &RetentionPolicy::new().redact(path.clone())).unwrap();

        let versions: Vec<u64> = log.entries().iter().map(|e| e.version).collect();
        let kept: Vec<u64> = redacted.entries().iter().map(|e| e.version).collect();
        prop_assert_eq!(versions, kept);

        for version in 0..=log.current_version() {
            let original = reconstruct_version(&log, version).unwrap();
            let scrubbed = reconstruct_version(&redacted, version).unwrap();
            if let Some(value) = path.lookup(&scrubbed) {
                prop_assert_eq!(value, &Value::from(REDACTED));
            }
            prop_assert_eq!(strip(original, &path), strip(scrubbed, &path));
        }
    }
}

#[test]
fn scenario_matches_reference_bytes() {
    let log = log::decode(&scenario_log_bytes()).unwrap();
    let entry = log.entry(1).unwrap();
    assert_eq!(entry.actor_id, Some(SCENARIO_ACTOR));
    assert_eq!(entry.timestamp, SCENARIO_TIMESTAMP);
    assert_eq!(
        reconstruct_version(&log, 1).unwrap(),
        scenario_after()
    );
}
