//! Query interface over stored records.
//!
//! The engine does not own storage. A host exposes its records through
//! [`HistorySource`], and [`History`] answers version queries by decoding
//! the stored log and replaying it. The live record always serves its own
//! current version directly, without replay.

use crate::capture::{canonicalize, strip_paths};
use crate::diff::diff;
use crate::error::{CoreError, CoreResult};
use crate::log::{self, VersionLog};
use crate::patch::Patch;
use crate::path::Path;
use crate::reconstruct::{materialize, oldest_reconstructible, resolve, VersionSelector};
use crate::Record;
use std::borrow::Cow;
use std::fmt;

/// A record and its stored log bytes, as loaded from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Live record state.
    pub record: Record,
    /// Encoded version log, empty if the record was never captured.
    pub log: Vec<u8>,
}

/// Read access to stored records.
pub trait HistorySource {
    /// Record identifier.
    type Key: ?Sized + fmt::Display;

    /// Loads the record with `key`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Host-specific load failures.
    fn load(&self, key: &Self::Key) -> CoreResult<Option<StoredRecord>>;
}

impl<S: HistorySource + ?Sized> HistorySource for &S {
    type Key = S::Key;

    fn load(&self, key: &Self::Key) -> CoreResult<Option<StoredRecord>> {
        (**self).load(key)
    }
}

/// Version queries over a [`HistorySource`].
///
/// ```
/// use rowlog_codec::Value;
/// use rowlog_core::{History, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.insert(1, Value::object([("name", Value::from("A"))])).unwrap();
/// store.update(1, Value::object([("name", Value::from("B"))]), Some(7), 100).unwrap();
///
/// let history = History::new(&store);
/// assert_eq!(history.get_version(&1, 0).unwrap().get("name"), Some(&Value::from("A")));
/// assert_eq!(history.actor_of(&1, 1).unwrap(), Some(7));
/// ```
#[derive(Debug, Clone)]
pub struct History<S> {
    source: S,
    ignore_paths: Vec<Path>,
}

impl<S: HistorySource> History<S> {
    /// Creates a query interface over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            ignore_paths: Vec::new(),
        }
    }

    /// Strips `paths` from live records before comparing them with
    /// history. Pass the capture configuration's ignore list so ignored
    /// fields do not show up as changes.
    #[must_use]
    pub fn ignore_paths(mut self, paths: Vec<Path>) -> Self {
        self.ignore_paths = paths;
        self
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The record's decoded log.
    ///
    /// # Errors
    ///
    /// [`CoreError::RecordNotFound`] or [`CoreError::MalformedLog`].
    pub fn log(&self, key: &S::Key) -> CoreResult<VersionLog> {
        self.load(key).map(|(_, log)| log)
    }

    /// The record's current version.
    ///
    /// # Errors
    ///
    /// See [`History::log`].
    pub fn current_version(&self, key: &S::Key) -> CoreResult<u64> {
        self.log(key).map(|log| log.current_version())
    }

    /// The record as of version `version`.
    ///
    /// # Errors
    ///
    /// [`CoreError::RecordNotFound`], [`CoreError::VersionNotFound`],
    /// [`CoreError::HistoryTruncated`], or a log decode or replay error.
    pub fn get_version(&self, key: &S::Key, version: u64) -> CoreResult<Record> {
        let (record, log) = self.load(key)?;
        state(record, &log, VersionSelector::ByVersion(version))
    }

    /// The record as of `timestamp`.
    ///
    /// # Errors
    ///
    /// See [`History::get_version`].
    pub fn get_at(&self, key: &S::Key, timestamp: i64) -> CoreResult<Record> {
        let (record, log) = self.load(key)?;
        state(record, &log, VersionSelector::ByTimestamp(timestamp))
    }

    /// The patch turning version `from` into version `to`. Either order
    /// works.
    ///
    /// # Errors
    ///
    /// See [`History::get_version`].
    pub fn diff_between(&self, key: &S::Key, from: u64, to: u64) -> CoreResult<Patch> {
        let (record, log) = self.load(key)?;
        let before = state(record.clone(), &log, VersionSelector::ByVersion(from))?;
        let after = state(record, &log, VersionSelector::ByVersion(to))?;
        Ok(diff(&before, &after))
    }

    /// The record value that reverts to version `version`.
    ///
    /// Reverting is a forward write: the caller writes the returned value
    /// back through its normal write path, which records a new version.
    ///
    /// # Errors
    ///
    /// See [`History::get_version`].
    pub fn revert_to(&self, key: &S::Key, version: u64) -> CoreResult<Record> {
        self.get_version(key, version)
    }

    /// Everything that changed since `timestamp`, as a patch from the
    /// state at that time to the live record.
    ///
    /// # Errors
    ///
    /// See [`History::get_version`].
    pub fn changes_since(&self, key: &S::Key, timestamp: i64) -> CoreResult<Patch> {
        let (record, log) = self.load(key)?;
        let then = state(record.clone(), &log, VersionSelector::ByTimestamp(timestamp))?;
        Ok(diff(&then, &record))
    }

    /// The actor responsible for version `version`.
    ///
    /// # Errors
    ///
    /// [`CoreError::VersionNotFound`] for version 0 or a version past the
    /// current one, [`CoreError::HistoryTruncated`] for a dropped version.
    pub fn actor_of(&self, key: &S::Key, version: u64) -> CoreResult<Option<i64>> {
        let (_, log) = self.load(key)?;
        if let Some(entry) = log.entry(version) {
            return Ok(entry.actor_id);
        }
        if version == 0 || version > log.current_version() {
            return Err(CoreError::VersionNotFound {
                requested: version,
                current: log.current_version(),
            });
        }
        Err(CoreError::HistoryTruncated {
            requested: VersionSelector::ByVersion(version),
            oldest_available: oldest_reconstructible(&log).unwrap_or(log.current_version()),
        })
    }

    fn load(&self, key: &S::Key) -> CoreResult<(Record, VersionLog)> {
        let stored = self
            .source
            .load(key)?
            .ok_or_else(|| CoreError::record_not_found(key))?;
        let log = log::decode(&stored.log)?;
        let record = canonicalize(Cow::Owned(stored.record))?.into_owned();
        let stripped = match strip_paths(&record, &self.ignore_paths) {
            Cow::Owned(stripped) => Some(stripped),
            Cow::Borrowed(_) => None,
        };
        Ok((stripped.unwrap_or(record), log))
    }
}

/// State at `selector`, serving the current version from the live record.
fn state(record: Record, log: &VersionLog, selector: VersionSelector) -> CoreResult<Record> {
    let version = resolve(log, selector)?;
    if version == log.current_version() {
        return Ok(record);
    }
    materialize(log, version, selector)
}
