//! Persisted layout of the version log.
//!
//! The log is a canonical CBOR map, so it can live in the same column
//! family as the record's own document data and other tools can read it
//! without this crate:
//!
//! ```text
//! {
//!   "v": current_version,                       ; unsigned integer
//!   "h": [                                      ; entries, oldest first
//!     [version, timestamp, actor_id | null, op, op, ...],
//!     ...
//!   ],
//!   "b": baseline_record                        ; optional
//! }
//!
//! op   = ["set", path, value]
//!      / ["remove", path]
//!      / ["insert", path ++ [index], value]
//! path = [ (text key / unsigned index)* ]
//! ```
//!
//! Timestamps are milliseconds since the Unix epoch. Unknown top-level
//! keys are rejected so that re-encoding is always byte-identical to the
//! accepted input.

use super::{VersionEntry, VersionLog};
use crate::error::{CoreError, CoreResult};
use crate::patch::{Patch, PatchOp};
use crate::path::{Path, PathToken};
use rowlog_codec::{from_cbor, to_canonical_cbor, Value};
use std::sync::Arc;

const KEY_VERSION: &str = "v";
const KEY_HISTORY: &str = "h";
const KEY_BASELINE: &str = "b";

/// Decodes a stored log.
///
/// Empty input means "no history yet" and decodes to an empty log. Any
/// other input must be a log document, so that accepted bytes always
/// re-encode to themselves.
///
/// # Errors
///
/// Returns [`CoreError::MalformedLog`] if the bytes are not canonical CBOR
/// or do not follow the layout above.
pub fn decode(bytes: &[u8]) -> CoreResult<VersionLog> {
    if bytes.is_empty() {
        return Ok(VersionLog::new());
    }
    let value = from_cbor(bytes).map_err(|e| CoreError::malformed_log(e.to_string()))?;
    from_value(&value)
}

/// Encodes a log to its canonical bytes.
pub fn encode(log: &VersionLog) -> Vec<u8> {
    to_canonical_cbor(&to_value(log))
}

/// Size of [`encode`]'s output, computed without encoding.
pub fn encoded_len(log: &VersionLog) -> usize {
    let entries: usize = log.entries().iter().map(|e| entry_encoded_len(e)).sum();
    log_encoded_len(log.current_version(), log.len(), entries, log.baseline())
}

pub(crate) fn entry_encoded_len(entry: &VersionEntry) -> usize {
    entry_to_value(entry).encoded_len()
}

/// Encoded size of a log made of the given parts, `entries_len` being the
/// summed encoded size of `entry_count` entries.
pub(crate) fn log_encoded_len(
    current_version: u64,
    entry_count: usize,
    entries_len: usize,
    baseline: Option<&Value>,
) -> usize {
    // Every top-level key is a one-byte text string.
    const KEY_LEN: usize = 2;
    uint_len(2 + u64::from(baseline.is_some()))
        + KEY_LEN
        + uint_len(current_version)
        + KEY_LEN
        + uint_len(entry_count as u64)
        + entries_len
        + baseline.map_or(0, |b| KEY_LEN + b.encoded_len())
}

fn uint_len(n: u64) -> usize {
    match n {
        0..=23 => 1,
        24..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Converts a log to its document form.
#[allow(clippy::cast_possible_wrap)]
pub fn to_value(log: &VersionLog) -> Value {
    let mut pairs = vec![
        (
            Value::from(KEY_VERSION),
            Value::Integer(log.current_version() as i64),
        ),
        (
            Value::from(KEY_HISTORY),
            Value::Array(log.entries().iter().map(|e| entry_to_value(e)).collect()),
        ),
    ];
    if let Some(baseline) = log.baseline() {
        pairs.push((Value::from(KEY_BASELINE), baseline.clone()));
    }
    Value::map(pairs)
}

#[allow(clippy::cast_possible_wrap)]
fn entry_to_value(entry: &VersionEntry) -> Value {
    let mut items = Vec::with_capacity(3 + entry.patch.len());
    items.push(Value::Integer(entry.version as i64));
    items.push(Value::Integer(entry.timestamp));
    items.push(entry.actor_id.map_or(Value::Null, Value::Integer));
    items.extend(entry.patch.ops().iter().map(op_to_value));
    Value::Array(items)
}

fn op_to_value(op: &PatchOp) -> Value {
    let mut items = vec![Value::from(op.tag()), op.target().to_value()];
    if let Some(value) = op.value() {
        items.push(value.clone());
    }
    Value::Array(items)
}

/// Parses a log from its document form.
///
/// # Errors
///
/// Returns [`CoreError::MalformedLog`] on any layout violation.
pub fn from_value(value: &Value) -> CoreResult<VersionLog> {
    let pairs = match value {
        Value::Map(pairs) => pairs,
        other => {
            return Err(CoreError::malformed_log(format!(
                "expected map, got {}",
                other.kind()
            )))
        }
    };

    let mut current_version = None;
    let mut history = None;
    let mut baseline = None;
    for (key, field) in pairs {
        match key.as_text() {
            Some(KEY_VERSION) => current_version = Some(version_from(field, "log version")?),
            Some(KEY_HISTORY) => {
                history = Some(field.as_array().ok_or_else(|| {
                    CoreError::malformed_log(format!("history is {}, not array", field.kind()))
                })?)
            }
            Some(KEY_BASELINE) => baseline = Some(field.clone()),
            _ => {
                return Err(CoreError::malformed_log(format!(
                    "unexpected top-level key {key:?}"
                )))
            }
        }
    }

    let current_version =
        current_version.ok_or_else(|| CoreError::malformed_log("missing field \"v\""))?;
    let history = history.ok_or_else(|| CoreError::malformed_log("missing field \"h\""))?;
    let entries = history
        .iter()
        .map(|item| entry_from_value(item).map(Arc::new))
        .collect::<CoreResult<Vec<_>>>()?;

    VersionLog::from_parts(current_version, entries, baseline)
}

fn version_from(value: &Value, what: &str) -> CoreResult<u64> {
    value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| CoreError::malformed_log(format!("{what} must be an unsigned integer")))
}

fn entry_from_value(value: &Value) -> CoreResult<VersionEntry> {
    let items = match value.as_array() {
        Some(items) if items.len() >= 3 => items,
        _ => {
            return Err(CoreError::malformed_log(
                "entry must be an array of at least 3 items",
            ))
        }
    };
    let version = version_from(&items[0], "entry version")?;
    let timestamp = items[1].as_integer().ok_or_else(|| {
        CoreError::malformed_log(format!("entry {version}: timestamp must be an integer"))
    })?;
    let actor_id = match &items[2] {
        Value::Null => None,
        Value::Integer(id) => Some(*id),
        other => {
            return Err(CoreError::malformed_log(format!(
                "entry {version}: actor id is {}",
                other.kind()
            )))
        }
    };
    let patch = items[3..]
        .iter()
        .map(op_from_value)
        .collect::<CoreResult<Patch>>()?;

    Ok(VersionEntry {
        version,
        timestamp,
        actor_id,
        patch,
    })
}

fn op_from_value(value: &Value) -> CoreResult<PatchOp> {
    let items = value
        .as_array()
        .ok_or_else(|| CoreError::malformed_log("operation must be an array"))?;
    let tag = items.first().and_then(Value::as_text);
    let path = items
        .get(1)
        .map(Path::from_value)
        .transpose()
        .map_err(|e| CoreError::malformed_log(e.to_string()))?;

    match (tag, path, &items[items.len().min(2)..]) {
        (Some("set"), Some(path), [value]) => Ok(PatchOp::Set {
            path,
            value: value.clone(),
        }),
        (Some("remove"), Some(path), []) => Ok(PatchOp::Remove { path }),
        (Some("insert"), Some(path), [value]) => match path.split_last() {
            Some((PathToken::Index(index), list)) => Ok(PatchOp::Insert {
                path: Path::new(list.to_vec()),
                index: *index,
                value: value.clone(),
            }),
            _ => Err(CoreError::malformed_log(
                "insert path must end with a list index",
            )),
        },
        (Some(tag @ ("set" | "remove" | "insert")), _, _) => Err(CoreError::malformed_log(
            format!("wrong arity for {tag:?} operation"),
        )),
        (Some(other), _, _) => Err(CoreError::malformed_log(format!(
            "unknown operation tag {other:?}"
        ))),
        (None, _, _) => Err(CoreError::malformed_log("operation tag must be text")),
    }
}
