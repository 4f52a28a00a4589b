//! Error types for rowlog core.

use crate::reconstruct::VersionSelector;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in history operations.
///
/// [`crate::capture`] returns this type directly; there is no separate
/// capture error wrapper.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stored log bytes violate the log schema.
    #[error("malformed history log: {message}")]
    MalformedLog {
        /// Description of the violation.
        message: String,
    },

    /// The requested state predates the retained history.
    #[error("history truncated: {requested} predates oldest available version {oldest_available}")]
    HistoryTruncated {
        /// What was asked for.
        requested: VersionSelector,
        /// Oldest version that can still be materialized.
        oldest_available: u64,
    },

    /// The requested version was never recorded.
    #[error("version {requested} not found (current version is {current})")]
    VersionNotFound {
        /// Requested version.
        requested: u64,
        /// The log's current version.
        current: u64,
    },

    /// The log advanced past the version the caller read.
    #[error("version conflict: expected version {expected}, log is at {found}")]
    VersionConflict {
        /// Version the caller observed.
        expected: u64,
        /// Version found in the supplied log.
        found: u64,
    },

    /// The version counter cannot be incremented.
    #[error("version counter exhausted at {current}")]
    VersionOverflow {
        /// The log's current version.
        current: u64,
    },

    /// A patch operation does not fit the record it is applied to.
    #[error("invalid patch at {path}: {message}")]
    InvalidPatch {
        /// Display form of the operation's path.
        path: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A record cannot be brought into canonical form.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Description of the problem.
        message: String,
    },

    /// Replaying a stored entry failed.
    #[error("entry {version} cannot be replayed: {reason}")]
    CorruptEntry {
        /// Version of the failing entry.
        version: u64,
        /// Underlying failure.
        reason: String,
    },

    /// A path is malformed.
    #[error("invalid path: {message}")]
    InvalidPath {
        /// Description of the problem.
        message: String,
    },

    /// A retention policy or capture configuration is unusable.
    #[error("invalid policy: {message}")]
    InvalidPolicy {
        /// Description of the problem.
        message: String,
    },

    /// The host has no record with this id.
    #[error("record not found: {id}")]
    RecordNotFound {
        /// Display form of the id.
        id: String,
    },

    /// A record with this id already exists.
    #[error("record already exists: {id}")]
    RecordExists {
        /// Display form of the id.
        id: String,
    },
}

impl CoreError {
    /// Creates a malformed log error.
    pub fn malformed_log(message: impl Into<String>) -> Self {
        Self::MalformedLog {
            message: message.into(),
        }
    }

    /// Creates an invalid patch error.
    pub fn invalid_patch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPatch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Creates an invalid policy error.
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(id: impl std::fmt::Display) -> Self {
        Self::RecordNotFound { id: id.to_string() }
    }

    /// Whether the caller can recover by choosing a later target.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::HistoryTruncated { .. })
    }
}
