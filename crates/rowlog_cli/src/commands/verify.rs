//! Verify command implementation.

use super::CommandResult;
use rowlog_core::reconstruct::replay;
use rowlog_core::{log, Record, VersionLog};
use std::fs;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of entries checked.
    pub entries_checked: usize,
    /// Number of states rebuilt by replay.
    pub states_rebuilt: usize,
    /// Problems that make the log unusable.
    pub errors: Vec<String>,
    /// Conditions worth knowing about that are not errors.
    pub warnings: Vec<String>,
}

impl VerifyResult {
    /// Whether no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path, current: Option<&Path>) -> CommandResult<()> {
    println!("Verifying history log at {}", path.display());
    println!();

    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let live = current.map(crate::json::read_record).transpose()?;
    let result = verify(&bytes, live.as_ref());

    println!(
        "  Entries checked: {}, states rebuilt: {}",
        result.entries_checked, result.states_rebuilt
    );
    for warning in &result.warnings {
        println!("    WARNING: {warning}");
    }
    for error in &result.errors {
        println!("    ERROR: {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ History verification passed");
        Ok(())
    } else {
        println!("✗ History verification failed");
        Err("Verification failed".into())
    }
}

/// Checks that `bytes` decode, re-encode identically and replay cleanly,
/// and that the newest state matches `live` when given.
pub fn verify(bytes: &[u8], live: Option<&Record>) -> VerifyResult {
    let mut result = VerifyResult::default();

    let log = match log::decode(bytes) {
        Ok(log) => log,
        Err(e) => {
            result.errors.push(e.to_string());
            return result;
        }
    };
    result.entries_checked = log.len();

    if !bytes.is_empty() {
        let encoded = log::encode(&log);
        if encoded != bytes {
            result
                .errors
                .push("log does not re-encode to the stored bytes".to_string());
        }
        if log::encoded_len(&log) != encoded.len() {
            result
                .errors
                .push("computed size disagrees with encoded size".to_string());
        }
    }

    check_replay(&log, live, &mut result);
    result
}

fn check_replay(log: &VersionLog, live: Option<&Record>, result: &mut VerifyResult) {
    if log.is_empty() {
        return;
    }
    if log.baseline().is_none() {
        result
            .warnings
            .push("no baseline stored; only the live record holds a full state".to_string());
        return;
    }
    match replay(log) {
        Ok(states) => {
            result.states_rebuilt = states.len();
            let newest = states.last().map(|(_, state)| state);
            if let (Some(live), Some(newest)) = (live, newest) {
                if live != newest {
                    result.errors.push(format!(
                        "live record differs from replayed version {}",
                        log.current_version()
                    ));
                }
            }
        }
        Err(e) => result.errors.push(e.to_string()),
    }
}
