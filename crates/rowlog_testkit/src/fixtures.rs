//! Test fixtures and log-building helpers.

use rowlog_codec::Value;
use rowlog_core::{capture_log, log, CaptureConfig, CaptureInput, Record, VersionLog};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Actor of the reference scenario's update.
pub const SCENARIO_ACTOR: i64 = 7;

/// Timestamp of the reference scenario's update.
pub const SCENARIO_TIMESTAMP: i64 = 100;

/// `{name: "A", tags: ["x"]}`, the reference scenario's first state.
pub fn scenario_before() -> Record {
    Value::object([
        ("name", Value::from("A")),
        ("tags", Value::Array(vec![Value::from("x")])),
    ])
}

/// `{name: "B", tags: ["x"]}`, the reference scenario's second state.
pub fn scenario_after() -> Record {
    Value::object([
        ("name", Value::from("B")),
        ("tags", Value::Array(vec![Value::from("x")])),
    ])
}

/// Log bytes after the reference scenario's single update.
pub fn scenario_log_bytes() -> Vec<u8> {
    let (before, after) = (scenario_before(), scenario_after());
    let input = CaptureInput::new(&before, &after, SCENARIO_TIMESTAMP).actor(SCENARIO_ACTOR);
    rowlog_core::capture(&input, &CaptureConfig::default()).expect("scenario capture")
}

/// A record's history built by capturing a sequence of states.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// States in write order. `states[0]` is the initial record.
    pub states: Vec<Record>,
    /// Version of each state; no-op writes repeat the previous version.
    pub versions: Vec<u64>,
    /// Timestamp of the write that produced each state.
    pub timestamps: Vec<i64>,
    /// Stored log bytes after the last write.
    pub bytes: Vec<u8>,
}

impl Timeline {
    /// Captures `states[i-1] -> states[i]` for each `i`, at timestamp
    /// `i * 10` by actor `i`.
    ///
    /// # Panics
    ///
    /// Panics if a capture fails.
    pub fn record(states: &[Record], config: &CaptureConfig) -> Self {
        let mut versions = vec![0];
        let mut timestamps = vec![0];
        let mut bytes = Vec::new();
        for (i, pair) in states.windows(2).enumerate() {
            let step = i64::try_from(i + 1).expect("step fits in i64");
            let input = CaptureInput::new(&pair[0], &pair[1], step * 10)
                .existing_log(&bytes)
                .actor(step);
            let captured = capture_log(&input, config).expect("capture");
            bytes = captured.bytes;
            versions.push(captured.log.current_version());
            timestamps.push(step * 10);
        }
        Self {
            states: states.to_vec(),
            versions,
            timestamps,
            bytes,
        }
    }

    /// Decoded final log.
    ///
    /// # Panics
    ///
    /// Panics if the bytes do not decode.
    pub fn log(&self) -> VersionLog {
        log::decode(&self.bytes).expect("timeline log decodes")
    }

    /// The final state.
    pub fn current(&self) -> &Record {
        self.states.last().expect("timeline has states")
    }
}

/// A temporary directory holding stored logs and records, for tools that
/// work on files.
pub struct TempFiles {
    dir: TempDir,
}

impl TempFiles {
    /// Creates an empty temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `name` and returns the full path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write fixture file");
        path
    }

    /// Reads `name` back.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.dir.path().join(name)).expect("Failed to read fixture file")
    }
}

impl Default for TempFiles {
    fn default() -> Self {
        Self::new()
    }
}
