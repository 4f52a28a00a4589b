//! Capture and retention configuration.

use crate::error::{CoreError, CoreResult};
use crate::path::Path;
use std::collections::BTreeSet;
use std::time::Duration;

/// Bounds on how much history a log keeps.
///
/// Limits are enforced by [`crate::compact`] after every append. All
/// limits are optional; the default keeps everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of retained entries.
    pub max_entries: Option<u32>,

    /// Maximum age of an entry, measured back from the newest entry's
    /// timestamp.
    pub max_age: Option<Duration>,

    /// Maximum encoded size of the log. The newest entry is always kept,
    /// so a single oversized change can exceed this.
    pub max_bytes: Option<usize>,

    /// Paths whose values are replaced by the redaction marker throughout
    /// history.
    pub redact_paths: BTreeSet<Path>,

    /// Whether dropped entries are folded into the baseline. When false,
    /// dropping entries discards the baseline and older states become
    /// unreachable.
    pub keep_baseline: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entries: None,
            max_age: None,
            max_bytes: None,
            redact_paths: BTreeSet::new(),
            keep_baseline: true,
        }
    }
}

impl RetentionPolicy {
    /// Creates a policy that retains everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry count limit.
    #[must_use]
    pub const fn max_entries(mut self, count: u32) -> Self {
        self.max_entries = Some(count);
        self
    }

    /// Sets the entry age limit.
    #[must_use]
    pub const fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    /// Sets the encoded size limit.
    #[must_use]
    pub const fn max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    /// Adds a path to redact.
    #[must_use]
    pub fn redact(mut self, path: Path) -> Self {
        self.redact_paths.insert(path);
        self
    }

    /// Sets whether dropped entries are folded into the baseline.
    #[must_use]
    pub const fn keep_baseline(mut self, value: bool) -> Self {
        self.keep_baseline = value;
        self
    }

    /// Whether the policy can drop entries.
    pub fn is_bounded(&self) -> bool {
        self.max_entries.is_some() || self.max_age.is_some() || self.max_bytes.is_some()
    }

    /// Checks the policy for limits that could never be met.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPolicy`] for a zero entry or byte limit.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_entries == Some(0) {
            return Err(CoreError::invalid_policy("max_entries must be at least 1"));
        }
        if self.max_bytes == Some(0) {
            return Err(CoreError::invalid_policy("max_bytes must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for [`crate::capture`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Retention applied after every append.
    pub retention: RetentionPolicy,

    /// Replace an undecodable stored log with an empty one instead of
    /// failing the write. The replacement is logged at warn level.
    pub reset_on_corruption: bool,

    /// Paths stripped from both snapshots before diffing. Changes under
    /// them never enter history.
    pub ignore_paths: Vec<Path>,
}

impl CaptureConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = policy;
        self
    }

    /// Sets whether corrupt logs are reset.
    #[must_use]
    pub const fn reset_on_corruption(mut self, value: bool) -> Self {
        self.reset_on_corruption = value;
        self
    }

    /// Adds a path to leave out of history.
    #[must_use]
    pub fn ignore(mut self, path: Path) -> Self {
        self.ignore_paths.push(path);
        self
    }

    /// Validates the retention policy and ignore list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPolicy`] if the retention policy is
    /// invalid or the root path is ignored.
    pub fn validate(&self) -> CoreResult<()> {
        self.retention.validate()?;
        if self.ignore_paths.iter().any(Path::is_root) {
            return Err(CoreError::invalid_policy("cannot ignore the whole record"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_retains_everything() {
        let policy = RetentionPolicy::default();
        assert!(!policy.is_bounded());
        assert!(policy.keep_baseline);
        assert!(policy.redact_paths.is_empty());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let policy = RetentionPolicy::new()
            .max_entries(10)
            .max_age(Duration::from_secs(60))
            .redact(Path::from("ssn"))
            .keep_baseline(false);

        assert_eq!(policy.max_entries, Some(10));
        assert_eq!(policy.max_age, Some(Duration::from_secs(60)));
        assert!(policy.redact_paths.contains(&Path::from("ssn")));
        assert!(!policy.keep_baseline);
        assert!(policy.is_bounded());

        let config = CaptureConfig::new()
            .retention(policy.clone())
            .reset_on_corruption(true)
            .ignore(Path::from("updated_at"));
        assert_eq!(config.retention, policy);
        assert!(config.reset_on_corruption);
        assert_eq!(config.ignore_paths, vec![Path::from("updated_at")]);
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(matches!(
            RetentionPolicy::new().max_entries(0).validate(),
            Err(CoreError::InvalidPolicy { .. })
        ));
        assert!(RetentionPolicy::new().max_bytes(0).validate().is_err());
        assert!(CaptureConfig::new().ignore(Path::root()).validate().is_err());
    }
}
