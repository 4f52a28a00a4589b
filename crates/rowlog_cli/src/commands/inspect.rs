//! Inspect command implementation.

use super::{load_log, CommandResult};
use rowlog_core::reconstruct::oldest_reconstructible;
use rowlog_core::VersionLog;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Log inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Log file path.
    pub path: String,
    /// Encoded size in bytes.
    pub size: usize,
    /// Current version.
    pub current_version: u64,
    /// Number of retained entries.
    pub entry_count: usize,
    /// Version of the oldest retained entry.
    pub oldest_version: Option<u64>,
    /// Oldest version that can be rebuilt.
    pub oldest_reconstructible: Option<u64>,
    /// Whether a baseline is stored.
    pub has_baseline: bool,
    /// Total patch operations across entries.
    pub op_count: usize,
    /// Distinct actors, excluding anonymous writes.
    pub actors: Vec<i64>,
    /// Earliest and latest entry timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<(i64, i64)>,
    /// Per-entry summaries (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntrySummary>>,
}

/// Summary of one entry.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    /// Entry version.
    pub version: u64,
    /// Capture timestamp.
    pub timestamp: i64,
    /// Responsible actor.
    pub actor_id: Option<i64>,
    /// Number of operations.
    pub ops: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, show_entries: bool, format: &str) -> CommandResult<()> {
    let (bytes, log) = load_log(path)?;
    let result = analyze(path, bytes.len(), &log, show_entries);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects statistics about `log`.
pub fn analyze(path: &Path, size: usize, log: &VersionLog, show_entries: bool) -> InspectResult {
    let entries = log.entries();
    let actors: BTreeSet<i64> = entries.iter().filter_map(|e| e.actor_id).collect();
    let time_range = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
        _ => None,
    };

    InspectResult {
        path: path.display().to_string(),
        size,
        current_version: log.current_version(),
        entry_count: log.len(),
        oldest_version: log.oldest_version(),
        oldest_reconstructible: oldest_reconstructible(log),
        has_baseline: log.baseline().is_some(),
        op_count: entries.iter().map(|e| e.patch.len()).sum(),
        actors: actors.into_iter().collect(),
        time_range,
        entries: show_entries.then(|| {
            entries
                .iter()
                .map(|e| EntrySummary {
                    version: e.version,
                    timestamp: e.timestamp,
                    actor_id: e.actor_id,
                    ops: e.patch.len(),
                })
                .collect()
        }),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("rowlog History Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {} bytes", result.size);
    println!();
    println!("Versions:");
    println!("  Current version:   {}", result.current_version);
    println!("  Retained entries:  {}", result.entry_count);
    println!("  Oldest entry:      {}", display_opt(result.oldest_version));
    println!(
        "  Oldest state:      {}",
        display_opt(result.oldest_reconstructible)
    );
    println!(
        "  Baseline:          {}",
        if result.has_baseline { "stored" } else { "none" }
    );
    println!("  Operations:        {}", result.op_count);
    if let Some((first, last)) = result.time_range {
        println!("  Time range:        {first} .. {last}");
    }
    println!("  Actors:            {:?}", result.actors);

    if let Some(entries) = &result.entries {
        println!();
        println!("Entries:");
        for entry in entries {
            println!(
                "  v{} at {} by {}: {} ops",
                entry.version,
                entry.timestamp,
                entry
                    .actor_id
                    .map_or_else(|| "-".to_string(), |a| a.to_string()),
                entry.ops
            );
        }
    }
}

fn display_opt(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
