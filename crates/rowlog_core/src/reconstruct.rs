//! Reconstruction of past record states.
//!
//! Patches only run forward, so every past state is rebuilt from the
//! log's baseline by replaying retained entries up to the target version.
//! The retained window is `[oldest_entry - 1, current_version]`; anything
//! below it is reported as [`CoreError::HistoryTruncated`] rather than
//! approximated.

use crate::error::{CoreError, CoreResult};
use crate::log::VersionLog;
use crate::Record;
use std::fmt;

/// Selects a state in a record's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// The state produced by this version. Version 0 is the state before
    /// any tracked change.
    ByVersion(u64),
    /// The newest state whose entry timestamp is at or before this
    /// instant (milliseconds since the Unix epoch).
    ByTimestamp(i64),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::ByVersion(v) => write!(f, "version {v}"),
            VersionSelector::ByTimestamp(ts) => write!(f, "timestamp {ts}"),
        }
    }
}

/// Resolves a selector to a concrete version number.
///
/// A timestamp before every retained entry resolves to version 0 when the
/// log still starts at version 1.
///
/// # Errors
///
/// - [`CoreError::VersionNotFound`] for a version above `current_version`
/// - [`CoreError::HistoryTruncated`] for a timestamp that predates the
///   retained entries
pub fn resolve(log: &VersionLog, selector: VersionSelector) -> CoreResult<u64> {
    match selector {
        VersionSelector::ByVersion(version) if version > log.current_version() => {
            Err(CoreError::VersionNotFound {
                requested: version,
                current: log.current_version(),
            })
        }
        VersionSelector::ByVersion(version) => Ok(version),
        VersionSelector::ByTimestamp(ts) => {
            if let Some(entry) = log.entries().iter().rev().find(|e| e.timestamp <= ts) {
                return Ok(entry.version);
            }
            match log.oldest_version() {
                None | Some(1) => Ok(0),
                Some(_) => Err(truncated(log, selector)),
            }
        }
    }
}

/// Materializes the record as of `selector`.
///
/// # Errors
///
/// Besides the errors of [`resolve`], returns
/// [`CoreError::HistoryTruncated`] when the target lies outside the
/// retained window or the log has no baseline, and
/// [`CoreError::CorruptEntry`] when a stored patch does not replay.
pub fn reconstruct(log: &VersionLog, selector: VersionSelector) -> CoreResult<Record> {
    let version = resolve(log, selector)?;
    materialize(log, version, selector)
}

/// Shorthand for [`reconstruct`] with [`VersionSelector::ByVersion`].
///
/// # Errors
///
/// See [`reconstruct`].
pub fn reconstruct_version(log: &VersionLog, version: u64) -> CoreResult<Record> {
    reconstruct(log, VersionSelector::ByVersion(version))
}

/// Oldest version that can be rebuilt from the log alone, if any.
pub fn oldest_reconstructible(log: &VersionLog) -> Option<u64> {
    log.baseline()?;
    Some(log.oldest_version().map_or(log.current_version(), |v| v - 1))
}

/// Replays every retained entry, returning each state in version order,
/// baseline first.
///
/// # Errors
///
/// [`CoreError::HistoryTruncated`] without a baseline,
/// [`CoreError::CorruptEntry`] on the first entry that fails to apply.
pub fn replay(log: &VersionLog) -> CoreResult<Vec<(u64, Record)>> {
    let floor = oldest_reconstructible(log)
        .ok_or_else(|| truncated(log, VersionSelector::ByVersion(0)))?;
    let mut state = log.baseline().cloned().unwrap_or_default();
    let mut states = Vec::with_capacity(log.len() + 1);
    states.push((floor, state.clone()));
    for entry in log.entries() {
        apply_entry(&mut state, entry.version, &entry.patch)?;
        states.push((entry.version, state.clone()));
    }
    Ok(states)
}

/// Rebuilds `version`, already resolved and known to be at most
/// `current_version`. `requested` is reported in errors.
pub(crate) fn materialize(
    log: &VersionLog,
    version: u64,
    requested: VersionSelector,
) -> CoreResult<Record> {
    let Some(floor) = oldest_reconstructible(log) else {
        if log.is_empty() {
            return Err(CoreError::VersionNotFound {
                requested: version,
                current: log.current_version(),
            });
        }
        return Err(truncated(log, requested));
    };
    if version < floor {
        return Err(truncated(log, requested));
    }

    let mut state = log.baseline().cloned().unwrap_or_default();
    for entry in log.entries().iter().take_while(|e| e.version <= version) {
        apply_entry(&mut state, entry.version, &entry.patch)?;
    }
    Ok(state)
}

fn apply_entry(state: &mut Record, version: u64, patch: &crate::Patch) -> CoreResult<()> {
    patch.apply(state).map_err(|e| CoreError::CorruptEntry {
        version,
        reason: e.to_string(),
    })
}

fn truncated(log: &VersionLog, requested: VersionSelector) -> CoreError {
    CoreError::HistoryTruncated {
        requested,
        oldest_available: oldest_reconstructible(log).unwrap_or(log.current_version()),
    }
}
