//! Show command implementation.

use super::{load_log, CommandResult};
use crate::json::{read_record, to_json};
use rowlog_core::reconstruct::{reconstruct, resolve};
use rowlog_core::{CoreResult, Record, VersionLog, VersionSelector};
use std::path::Path;

/// Runs the show command.
pub fn run(path: &Path, selector: VersionSelector, current: Option<&Path>) -> CommandResult<()> {
    let (_, log) = load_log(path)?;
    let live = current.map(read_record).transpose()?;
    let (version, state) = state_at(&log, selector, live)?;
    println!("# version {version}");
    println!("{}", serde_json::to_string_pretty(&to_json(&state))?);
    Ok(())
}

/// Resolves `selector` and materializes that state. The live record, when
/// given, answers for the current version without replay.
pub fn state_at(
    log: &VersionLog,
    selector: VersionSelector,
    live: Option<Record>,
) -> CoreResult<(u64, Record)> {
    let version = resolve(log, selector)?;
    match live {
        Some(live) if version == log.current_version() => Ok((version, live)),
        _ => reconstruct(log, VersionSelector::ByVersion(version)).map(|state| (version, state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlog_core::{log, CoreError};
    use rowlog_testkit::prelude::*;

    #[test]
    fn versions_and_timestamps() {
        let log = log::decode(&scenario_log_bytes()).unwrap();
        assert_eq!(
            state_at(&log, VersionSelector::ByVersion(0), None).unwrap(),
            (0, scenario_before())
        );
        assert_eq!(
            state_at(&log, VersionSelector::ByTimestamp(SCENARIO_TIMESTAMP), None).unwrap(),
            (1, scenario_after())
        );
        assert!(matches!(
            state_at(&log, VersionSelector::ByVersion(2), None),
            Err(CoreError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn live_record_serves_the_current_version() {
        let log = log::decode(&scenario_log_bytes()).unwrap().with_baseline(None);
        assert!(state_at(&log, VersionSelector::ByVersion(1), None)
            .unwrap_err()
            .is_truncation());
        assert_eq!(
            state_at(&log, VersionSelector::ByVersion(1), Some(scenario_after())).unwrap(),
            (1, scenario_after())
        );
    }

    #[test]
    fn run_prints_states() {
        let files = TempFiles::new();
        let path = files.write("row.cbor", scenario_log_bytes());
        run(&path, VersionSelector::ByVersion(0), None).unwrap();
        run(&path, VersionSelector::ByTimestamp(50), None).unwrap();
        assert!(run(&path, VersionSelector::ByVersion(9), None).is_err());
    }
}
