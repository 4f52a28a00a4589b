//! Log compaction.
//!
//! Compaction enforces a [`RetentionPolicy`] on a log: it redacts
//! configured paths and drops the oldest entries that exceed the count,
//! age or size limits. Dropped entries are folded into the baseline so the
//! oldest retained state stays reconstructible.
//!
//! ## Invariants
//!
//! - Version numbers are never changed; entries are only dropped from the
//!   front
//! - The newest entry is always retained
//! - Compaction is idempotent for a fixed policy
//! - Redaction touches only values at or under the redacted paths

use crate::config::RetentionPolicy;
use crate::error::CoreResult;
use crate::log::{self, entry_encoded_len, log_encoded_len, VersionEntry, VersionLog};
use crate::patch::{is_redacted, PatchOp, REDACTED};
use crate::path::Path;
use crate::Record;
use rowlog_codec::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Number of entries before compaction.
    pub input_entries: usize,
    /// Number of entries after compaction.
    pub output_entries: usize,
    /// Number of operations and baseline values newly redacted.
    pub values_redacted: usize,
    /// Encoded size before compaction.
    pub input_bytes: usize,
    /// Encoded size after compaction.
    pub output_bytes: usize,
    /// Whether the compacted log still has a baseline.
    pub baseline_retained: bool,
}

impl CompactionStats {
    /// Number of entries dropped.
    pub fn entries_dropped(&self) -> usize {
        self.input_entries - self.output_entries
    }

    /// Whether compaction changed anything.
    pub fn changed(&self) -> bool {
        self.entries_dropped() > 0 || self.values_redacted > 0
    }
}

/// Applies `policy` to `log`, returning the compacted log. `log` itself is
/// unchanged; untouched entries are shared with the result.
///
/// # Errors
///
/// Returns [`crate::CoreError::InvalidPolicy`] if the policy does not
/// validate.
pub fn compact(log: &VersionLog, policy: &RetentionPolicy) -> CoreResult<VersionLog> {
    compact_with_stats(log, policy).map(|(log, _)| log)
}

/// Like [`compact`], also reporting what was done.
///
/// # Errors
///
/// See [`compact`].
pub fn compact_with_stats(
    log: &VersionLog,
    policy: &RetentionPolicy,
) -> CoreResult<(VersionLog, CompactionStats)> {
    policy.validate()?;

    let mut values_redacted = 0;
    let mut entries: Vec<Arc<VersionEntry>> = log
        .entries()
        .iter()
        .map(|entry| match redact_entry(entry, &policy.redact_paths) {
            Some((redacted, count)) => {
                values_redacted += count;
                Arc::new(redacted)
            }
            None => Arc::clone(entry),
        })
        .collect();
    let mut baseline = log.baseline().cloned();
    if let Some(record) = baseline.as_mut() {
        values_redacted += redact_record(record, &policy.redact_paths);
    }

    let forced = forced_drops(&entries, policy);
    let sizes: Vec<usize> = entries.iter().map(|e| entry_encoded_len(e)).collect();
    let mut retained_bytes: usize = sizes.iter().sum();
    let mut dropped = 0;
    while dropped + 1 < entries.len() {
        let over_bytes = policy.max_bytes.is_some_and(|max| {
            let size = log_encoded_len(
                log.current_version(),
                entries.len() - dropped,
                retained_bytes,
                baseline.as_ref(),
            );
            size > max
        });
        if dropped >= forced && !over_bytes {
            break;
        }
        baseline = fold(baseline, &entries[dropped], policy.keep_baseline);
        retained_bytes -= sizes[dropped];
        dropped += 1;
    }
    entries.drain(..dropped);

    let compacted = log.with_entries(entries, baseline);
    let stats = CompactionStats {
        input_entries: log.len(),
        output_entries: compacted.len(),
        values_redacted,
        input_bytes: log::encoded_len(log),
        output_bytes: log::encoded_len(&compacted),
        baseline_retained: compacted.baseline().is_some(),
    };
    if stats.changed() {
        debug!(
            version = compacted.current_version(),
            dropped = stats.entries_dropped(),
            redacted = stats.values_redacted,
            bytes = stats.output_bytes,
            "compacted history log"
        );
    }
    Ok((compacted, stats))
}

/// Entries that must go to satisfy the count and age limits, never
/// counting the newest.
fn forced_drops(entries: &[Arc<VersionEntry>], policy: &RetentionPolicy) -> usize {
    let Some(newest) = entries.last() else {
        return 0;
    };
    let by_count = policy
        .max_entries
        .map_or(0, |max| entries.len().saturating_sub(max as usize));
    let by_age = policy.max_age.map_or(0, |age| {
        let max_ms = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
        entries[..entries.len() - 1]
            .iter()
            .take_while(|e| newest.timestamp.saturating_sub(e.timestamp) > max_ms)
            .count()
    });
    by_count.max(by_age)
}

/// Advances the baseline past `entry`, or discards it.
fn fold(baseline: Option<Record>, entry: &VersionEntry, keep: bool) -> Option<Record> {
    let mut record = baseline.filter(|_| keep)?;
    match entry.patch.apply(&mut record) {
        Ok(()) => Some(record),
        Err(e) => {
            warn!(
                version = entry.version,
                error = %e,
                "entry does not replay onto baseline; dropping baseline"
            );
            None
        }
    }
}

/// Redacted copy of `entry`, or `None` if nothing in it needs redacting.
fn redact_entry(entry: &VersionEntry, paths: &BTreeSet<Path>) -> Option<(VersionEntry, usize)> {
    if paths.is_empty() {
        return None;
    }
    let mut patch = entry.patch.clone();
    let mut count = 0;
    for op in patch.ops_mut() {
        let mut hit = false;
        for path in paths {
            hit |= redact_op(op, path);
        }
        count += usize::from(hit);
    }
    (count > 0).then(|| {
        (
            VersionEntry {
                patch,
                ..entry.clone()
            },
            count,
        )
    })
}

fn redact_op(op: &mut PatchOp, path: &Path) -> bool {
    let target = op.target();
    let Some(value) = op.value_mut() else {
        return false;
    };
    if target.starts_with(path) {
        return redact_value(value);
    }
    if path.starts_with(&target) {
        let inner = Path::new(path.tokens()[target.len()..].to_vec());
        if let Some(found) = inner.lookup_mut(value) {
            return redact_value(found);
        }
    }
    false
}

/// Redacts every listed path present in `record`.
pub(crate) fn redact_record(record: &mut Record, paths: &BTreeSet<Path>) -> usize {
    let mut count = 0;
    for path in paths {
        if let Some(value) = path.lookup_mut(record) {
            count += usize::from(redact_value(value));
        }
    }
    count
}

fn redact_value(value: &mut Value) -> bool {
    if is_redacted(value) {
        return false;
    }
    *value = Value::from(REDACTED);
    true
}
