//! # rowlog core
//!
//! Per-record version history, embedded next to the record it describes.
//!
//! Every write to a tracked record goes through [`capture`], which diffs
//! the old and new snapshots and appends the patch to the record's
//! [`VersionLog`]. The log is itself a canonical CBOR document, so the host
//! stores it in the same row and the same atomic write as the record.
//! Past states are rebuilt on demand by [`reconstruct()`] or through the
//! [`History`] query interface.
//!
//! ## Components
//!
//! - [`diff`]: structural patch between two records
//! - [`log`]: the version log and its persisted layout
//! - [`reconstruct`](mod@reconstruct): replay to a version or timestamp
//! - [`compact`]: retention limits and redaction
//! - [`capture`]: the per-write entry point
//!
//! ## Concurrency
//!
//! The engine holds no state and spawns nothing. The host must hold the
//! row lock from reading the stored log until the returned log is
//! persisted; [`InMemoryStore`] shows how.
//!
//! ## Example
//!
//! ```
//! use rowlog_codec::Value;
//! use rowlog_core::{capture, log, reconstruct_version, CaptureConfig, CaptureInput};
//!
//! let old = Value::object([("name", Value::from("A"))]);
//! let new = Value::object([("name", Value::from("B"))]);
//!
//! let bytes = capture(&CaptureInput::new(&old, &new, 100).actor(7), &CaptureConfig::default())?;
//! let log = log::decode(&bytes)?;
//! assert_eq!(log.current_version(), 1);
//! assert_eq!(reconstruct_version(&log, 0)?, old);
//! # Ok::<(), rowlog_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capture;
mod compaction;
mod config;
mod diff;
mod error;
mod history;
pub mod log;
mod patch;
mod path;
pub mod reconstruct;
mod store;

pub use capture::{capture, capture_log, CaptureInput, Captured};
pub use compaction::{compact, compact_with_stats, CompactionStats};
pub use config::{CaptureConfig, RetentionPolicy};
pub use diff::diff;
pub use error::{CoreError, CoreResult};
pub use history::{History, HistorySource, StoredRecord};
pub use log::{VersionEntry, VersionLog, MAX_VERSION};
pub use patch::{is_redacted, Patch, PatchOp, REDACTED};
pub use path::{Path, PathToken};
pub use reconstruct::{reconstruct, reconstruct_version, VersionSelector};
pub use rowlog_codec::Value;
pub use store::{InMemoryStore, RecordId};

/// A record: the externally owned document whose history is tracked.
pub type Record = Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
