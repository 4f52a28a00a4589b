//! Compact command implementation.

use super::{load_log, CommandResult};
use rowlog_core::{compact_with_stats, log, CompactionStats, Path as RecordPath, RetentionPolicy};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Retention options given on the command line.
#[derive(Debug, Default)]
pub struct CompactOptions {
    /// Entry count limit.
    pub max_entries: Option<u32>,
    /// Entry age limit in seconds.
    pub max_age_secs: Option<u64>,
    /// Encoded size limit.
    pub max_bytes: Option<usize>,
    /// Dotted paths to redact.
    pub redact: Vec<String>,
    /// Discard the baseline instead of folding dropped entries into it.
    pub drop_baseline: bool,
}

impl CompactOptions {
    /// Builds and validates the retention policy.
    pub fn policy(&self) -> CommandResult<RetentionPolicy> {
        let mut policy = RetentionPolicy::new().keep_baseline(!self.drop_baseline);
        policy.max_entries = self.max_entries;
        policy.max_age = self.max_age_secs.map(Duration::from_secs);
        policy.max_bytes = self.max_bytes;
        for path in &self.redact {
            policy = policy.redact(RecordPath::parse(path)?);
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// Runs the compact command.
pub fn run(
    path: &Path,
    options: &CompactOptions,
    dry_run: bool,
    output: Option<&Path>,
) -> CommandResult<()> {
    let policy = options.policy()?;
    let (_, history) = load_log(path)?;

    println!("Compacting history log at {}", path.display());
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let (compacted, stats) = compact_with_stats(&history, &policy)?;
    print_stats(&stats);

    if dry_run {
        return Ok(());
    }
    let target = output.unwrap_or(path);
    if !stats.changed() && target == path {
        println!();
        println!("No compaction needed - log already satisfies the policy");
        return Ok(());
    }

    println!();
    println!("Writing compacted log...");
    write_atomically(target, &log::encode(&compacted))?;
    info!(path = %target.display(), bytes = stats.output_bytes, "wrote compacted log");
    println!("✓ Compaction complete");
    Ok(())
}

fn print_stats(stats: &CompactionStats) {
    println!("Compaction Analysis:");
    println!("  Input entries:   {}", stats.input_entries);
    println!("  Output entries:  {}", stats.output_entries);
    println!("  Values redacted: {}", stats.values_redacted);
    println!(
        "  Baseline:        {}",
        if stats.baseline_retained { "kept" } else { "none" }
    );
    println!();
    println!("  Size before: {} bytes", stats.input_bytes);
    println!("  Size after:  {} bytes", stats.output_bytes);
    let saved = stats.input_bytes.saturating_sub(stats.output_bytes);
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        saved,
        if stats.input_bytes > 0 {
            (saved as f64 / stats.input_bytes as f64) * 100.0
        } else {
            0.0
        }
    );
}

fn write_atomically(target: &Path, bytes: &[u8]) -> CommandResult<()> {
    let temp_path = target.with_extension("compact");
    {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(bytes)?;
        temp_file.sync_all()?;
    }
    fs::rename(&temp_path, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlog_codec::Value;
    use rowlog_core::{is_redacted, reconstruct_version, CaptureConfig};
    use rowlog_testkit::prelude::*;

    fn five_versions() -> Vec<u8> {
        let states: Vec<Value> = (0..6)
            .map(|n| Value::object([("n", Value::from(n)), ("ssn", Value::from("123"))]))
            .collect();
        Timeline::record(&states, &CaptureConfig::default()).bytes
    }

    #[test]
    fn options_build_policies() {
        let options = CompactOptions {
            max_entries: Some(3),
            max_age_secs: Some(60),
            redact: vec!["profile.ssn".to_string()],
            drop_baseline: true,
            ..CompactOptions::default()
        };
        let policy = options.policy().unwrap();
        assert_eq!(policy.max_entries, Some(3));
        assert_eq!(policy.max_age, Some(Duration::from_secs(60)));
        assert!(!policy.keep_baseline);
        assert!(policy
            .redact_paths
            .contains(&RecordPath::parse("profile.ssn").unwrap()));

        let zero = CompactOptions {
            max_entries: Some(0),
            ..CompactOptions::default()
        };
        assert!(zero.policy().is_err());
        let bad_path = CompactOptions {
            redact: vec!["a..b".to_string()],
            ..CompactOptions::default()
        };
        assert!(bad_path.policy().is_err());
    }

    #[test]
    fn compacts_in_place() {
        let files = TempFiles::new();
        let path = files.write("row.cbor", five_versions());
        let options = CompactOptions {
            max_entries: Some(2),
            ..CompactOptions::default()
        };
        run(&path, &options, false, None).unwrap();

        let compacted = log::decode(&files.read("row.cbor")).unwrap();
        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted.current_version(), 5);
        assert_eq!(
            reconstruct_version(&compacted, 3).unwrap().get("n"),
            Some(&Value::from(3))
        );
    }

    #[test]
    fn dry_run_and_output_file() {
        let files = TempFiles::new();
        let original = five_versions();
        let path = files.write("row.cbor", &original);
        let options = CompactOptions {
            redact: vec!["ssn".to_string()],
            ..CompactOptions::default()
        };

        run(&path, &options, true, None).unwrap();
        assert_eq!(files.read("row.cbor"), original);

        let out = files.path().join("redacted.cbor");
        run(&path, &options, false, Some(&out)).unwrap();
        assert_eq!(files.read("row.cbor"), original);
        let redacted = log::decode(&files.read("redacted.cbor")).unwrap();
        let state = reconstruct_version(&redacted, 0).unwrap();
        assert!(state.get("ssn").is_some_and(is_redacted));
    }
}
