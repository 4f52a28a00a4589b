//! The embedded version log.
//!
//! A [`VersionLog`] is an append-only sequence of [`VersionEntry`] values
//! plus an optional baseline record. Entries are shared behind `Arc`, so
//! appending produces a new log that shares every existing entry with the
//! old one; a reader holding the old log never sees the new entry.
//!
//! ## Invariants
//!
//! - Entry versions are >= 1 and strictly increasing
//! - `current_version` equals the last entry's version, or 0 with no entries
//! - Entries are never modified after appending, only dropped from the
//!   front (compaction) or rewritten wholesale (redaction)
//! - The baseline, when present, is the record state immediately before
//!   the oldest retained entry

mod format;

pub use format::{decode, encode, encoded_len, from_value, to_value};
pub(crate) use format::{entry_encoded_len, log_encoded_len};

use crate::error::{CoreError, CoreResult};
use crate::patch::Patch;
use crate::Record;
use std::sync::Arc;

/// Largest version number a log can reach. Versions are persisted as
/// non-negative document integers.
#[allow(clippy::cast_sign_loss)]
pub const MAX_VERSION: u64 = i64::MAX as u64;

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Permanent version number of the state this entry produces.
    pub version: u64,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Who made the change, if known.
    pub actor_id: Option<i64>,
    /// Edits from the previous state to this one.
    pub patch: Patch,
}

/// The history of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionLog {
    current_version: u64,
    entries: Vec<Arc<VersionEntry>>,
    baseline: Option<Record>,
}

impl VersionLog {
    /// Creates an empty log at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a log from parts, checking the version invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedLog`] if versions are not strictly
    /// increasing from 1 or `current_version` disagrees with the entries.
    pub fn from_parts(
        current_version: u64,
        entries: Vec<Arc<VersionEntry>>,
        baseline: Option<Record>,
    ) -> CoreResult<Self> {
        let mut previous = 0u64;
        for entry in &entries {
            if entry.version <= previous {
                return Err(CoreError::malformed_log(format!(
                    "entry version {} does not follow {previous}",
                    entry.version
                )));
            }
            previous = entry.version;
        }
        if previous > MAX_VERSION {
            return Err(CoreError::malformed_log(format!(
                "entry version {previous} exceeds {MAX_VERSION}"
            )));
        }
        if current_version != previous {
            return Err(CoreError::malformed_log(format!(
                "current version {current_version} but last entry is {previous}"
            )));
        }
        Ok(Self {
            current_version,
            entries,
            baseline,
        })
    }

    /// Version of the newest recorded state, 0 if nothing was recorded.
    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> &[Arc<VersionEntry>] {
        &self.entries
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The record state before the oldest retained entry.
    pub fn baseline(&self) -> Option<&Record> {
        self.baseline.as_ref()
    }

    /// Version of the oldest retained entry.
    pub fn oldest_version(&self) -> Option<u64> {
        self.entries.first().map(|e| e.version)
    }

    /// Looks up a retained entry by version.
    pub fn entry(&self, version: u64) -> Option<&VersionEntry> {
        self.entries
            .binary_search_by_key(&version, |e| e.version)
            .ok()
            .map(|idx| self.entries[idx].as_ref())
    }

    /// Builds the entry that would be appended next.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VersionOverflow`] when the version counter is
    /// exhausted.
    pub fn next_entry(
        &self,
        timestamp: i64,
        actor_id: Option<i64>,
        patch: Patch,
    ) -> CoreResult<VersionEntry> {
        if self.current_version >= MAX_VERSION {
            return Err(CoreError::VersionOverflow {
                current: self.current_version,
            });
        }
        let version = self.current_version + 1;
        Ok(VersionEntry {
            version,
            timestamp,
            actor_id,
            patch,
        })
    }

    /// Returns a new log with `entry` appended. `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VersionConflict`] unless `entry.version` is
    /// exactly `current_version + 1`.
    pub fn append(&self, entry: VersionEntry) -> CoreResult<Self> {
        if Some(entry.version) != self.current_version.checked_add(1) {
            return Err(CoreError::VersionConflict {
                expected: self.current_version,
                found: entry.version.saturating_sub(1),
            });
        }
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        let current_version = entry.version;
        entries.push(Arc::new(entry));
        Ok(Self {
            current_version,
            entries,
            baseline: self.baseline.clone(),
        })
    }

    /// Replaces the baseline.
    #[must_use]
    pub fn with_baseline(mut self, baseline: Option<Record>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Rebuilds the log from retained entries without re-checking
    /// invariants. Callers only ever remove a prefix of `entries` or
    /// rewrite entry bodies in place.
    pub(crate) fn with_entries(
        &self,
        entries: Vec<Arc<VersionEntry>>,
        baseline: Option<Record>,
    ) -> Self {
        debug_assert!(entries.last().map_or(true, |e| e.version == self.current_version));
        Self {
            current_version: self.current_version,
            entries,
            baseline,
        }
    }
}
