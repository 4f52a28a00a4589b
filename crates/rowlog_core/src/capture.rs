//! The capture entry point.
//!
//! [`capture`] is what a host write path calls for every mutation of a
//! tracked record. It is a pure function of its inputs: it decodes the
//! stored log, diffs the two snapshots, appends an entry, compacts and
//! returns the bytes to store. Persisting those bytes in the same atomic
//! write as the new record is the caller's job, as is holding the row
//! lock for the whole read-capture-write cycle.

use crate::compaction::compact;
use crate::config::CaptureConfig;
use crate::diff::diff;
use crate::error::{CoreError, CoreResult};
use crate::log::{self, VersionLog};
use crate::path::Path;
use crate::Record;
use std::borrow::Cow;
use tracing::{debug, warn};

/// One write, as seen by [`capture`].
#[derive(Debug, Clone, Copy)]
pub struct CaptureInput<'a> {
    /// Log bytes stored with the record before this write. `None` for a
    /// record that was never captured.
    pub existing_log: Option<&'a [u8]>,
    /// Record state before the write.
    pub old_record: &'a Record,
    /// Record state after the write.
    pub new_record: &'a Record,
    /// Who made the change.
    pub actor_id: Option<i64>,
    /// Clock reading in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Version the caller read under its row lock, if it tracks one.
    pub expected_version: Option<u64>,
}

impl<'a> CaptureInput<'a> {
    /// Creates an input for a change from `old_record` to `new_record`.
    #[must_use]
    pub fn new(old_record: &'a Record, new_record: &'a Record, timestamp: i64) -> Self {
        Self {
            existing_log: None,
            old_record,
            new_record,
            actor_id: None,
            timestamp,
            expected_version: None,
        }
    }

    /// Sets the stored log bytes.
    #[must_use]
    pub fn existing_log(mut self, bytes: &'a [u8]) -> Self {
        self.existing_log = Some(bytes);
        self
    }

    /// Sets the actor.
    #[must_use]
    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Sets the version the caller expects the stored log to be at.
    #[must_use]
    pub fn expect_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// What [`capture_log`] produced.
#[derive(Debug, Clone)]
pub struct Captured {
    /// The updated, compacted log.
    pub log: VersionLog,
    /// Encoded form of `log`, or the unchanged input bytes after a no-op
    /// write.
    pub bytes: Vec<u8>,
    /// Whether an entry was appended.
    pub appended: bool,
}

/// Records one write and returns the log bytes to persist.
///
/// When the snapshots do not differ the stored bytes come back unchanged
/// and no version is consumed.
///
/// # Errors
///
/// - [`CoreError::InvalidPolicy`] if `config` does not validate
/// - [`CoreError::InvalidRecord`] if a snapshot holds a map with a
///   repeated key
/// - [`CoreError::MalformedLog`] if the stored log does not decode and
///   `reset_on_corruption` is off
/// - [`CoreError::VersionConflict`] if the stored log is ahead of
///   `expected_version`
/// - [`CoreError::VersionOverflow`] if the version counter is exhausted
///
/// # Panics
///
/// Panics if the stored log is *behind* `expected_version`. A version
/// going backwards means the caller let two writers interleave on the
/// same record, and accepting the write would silently reorder history.
pub fn capture(input: &CaptureInput<'_>, config: &CaptureConfig) -> CoreResult<Vec<u8>> {
    capture_log(input, config).map(|captured| captured.bytes)
}

/// Like [`capture`], also returning the decoded result.
///
/// # Errors
///
/// See [`capture`].
///
/// # Panics
///
/// See [`capture`].
pub fn capture_log(input: &CaptureInput<'_>, config: &CaptureConfig) -> CoreResult<Captured> {
    config.validate()?;

    let existing = input.existing_log.unwrap_or_default();
    let (log, reset) = match log::decode(existing) {
        Ok(log) => (log, false),
        Err(e @ CoreError::MalformedLog { .. }) if config.reset_on_corruption => {
            warn!(error = %e, "stored history log is corrupt; starting a new log");
            (VersionLog::new(), true)
        }
        Err(e) => return Err(e),
    };

    if let (Some(expected), false) = (input.expected_version, reset) {
        let found = log.current_version();
        assert!(
            found >= expected,
            "history version regressed: caller read version {expected}, stored log is at {found}"
        );
        if found > expected {
            return Err(CoreError::VersionConflict { expected, found });
        }
    }

    let old_record = canonicalize(Cow::Borrowed(input.old_record))?;
    let new_record = canonicalize(Cow::Borrowed(input.new_record))?;
    let old_record = strip_paths(&old_record, &config.ignore_paths);
    let new_record = strip_paths(&new_record, &config.ignore_paths);
    let patch = diff(&old_record, &new_record);
    if patch.is_empty() {
        debug!(version = log.current_version(), "no-op write; history unchanged");
        let bytes = if reset {
            log::encode(&log)
        } else {
            existing.to_vec()
        };
        return Ok(Captured {
            log,
            bytes,
            appended: false,
        });
    }

    let log = if log.is_empty() && log.baseline().is_none() {
        log.with_baseline(Some(old_record.into_owned()))
    } else {
        log
    };
    let ops = patch.len();
    let entry = log.next_entry(input.timestamp, input.actor_id, patch)?;
    let log = compact(&log.append(entry)?, &config.retention)?;
    let bytes = log::encode(&log);

    debug!(
        version = log.current_version(),
        ops,
        entries = log.len(),
        bytes = bytes.len(),
        "captured change"
    );
    Ok(Captured {
        log,
        bytes,
        appended: true,
    })
}

/// `record` with every map in canonical key order. Records that already
/// are pass through untouched.
pub(crate) fn canonicalize(record: Cow<'_, Record>) -> CoreResult<Cow<'_, Record>> {
    if record.is_canonical() {
        return Ok(record);
    }
    record
        .into_owned()
        .into_canonical()
        .map(Cow::Owned)
        .map_err(|e| CoreError::invalid_record(e.to_string()))
}

/// `record` without the values at `paths`. Borrows when there is nothing
/// to strip.
pub(crate) fn strip_paths<'r>(record: &'r Record, paths: &[Path]) -> Cow<'r, Record> {
    if !paths.iter().any(|path| path.lookup(record).is_some()) {
        return Cow::Borrowed(record);
    }
    let mut stripped = record.clone();
    for path in paths {
        path.remove_from(&mut stripped);
    }
    Cow::Owned(stripped)
}
