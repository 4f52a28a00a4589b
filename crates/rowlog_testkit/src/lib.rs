//! # rowlog testkit
//!
//! Test utilities for rowlog.
//!
//! This crate provides:
//! - Property-based test generators using proptest
//! - Fixtures: the reference scenario, captured timelines, temp files
//! - Concurrent write stress helpers for host stores
//!
//! The engine laws themselves are checked in this crate's `tests/`.
//!
//! ## Usage
//!
//! ```rust
//! use rowlog_core::CaptureConfig;
//! use rowlog_testkit::prelude::*;
//!
//! let timeline = Timeline::record(&[scenario_before(), scenario_after()], &CaptureConfig::default());
//! assert_eq!(timeline.versions, vec![0, 1]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
