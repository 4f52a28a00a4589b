//! CLI command implementations.

pub mod compact;
pub mod diff;
pub mod inspect;
pub mod show;
pub mod verify;

use rowlog_core::{log, VersionLog};
use std::fs;
use std::path::Path;

/// Boxed error returned by every command.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Reads and decodes a stored log file.
pub fn load_log(path: &Path) -> CommandResult<(Vec<u8>, VersionLog)> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let log = log::decode(&bytes)?;
    Ok((bytes, log))
}
