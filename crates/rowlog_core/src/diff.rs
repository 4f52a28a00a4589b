//! Structural diff of two records.
//!
//! Maps with text keys are compared key by key, in sorted key order, so the
//! same pair of inputs always yields the same patch. Everything else,
//! lists included, is atomic: a changed list is replaced whole with a
//! single `set`. Element-wise list diffs would need a notion of element
//! identity that records do not carry.

use crate::patch::{Patch, PatchOp};
use crate::path::{Path, PathToken};
use rowlog_codec::Value;
use std::collections::BTreeMap;

/// Computes the patch that turns `old` into `new`.
///
/// Returns an empty patch iff the two values are equal. Neither input is
/// modified.
///
/// ```
/// use rowlog_codec::Value;
/// use rowlog_core::{diff, Path, PatchOp};
///
/// let old = Value::object([("name", Value::from("A"))]);
/// let new = Value::object([("name", Value::from("B"))]);
/// let patch = diff(&old, &new);
/// assert_eq!(
///     patch.ops(),
///     &[PatchOp::Set { path: Path::from("name"), value: Value::from("B") }]
/// );
/// ```
pub fn diff(old: &Value, new: &Value) -> Patch {
    let mut ops = Vec::new();
    diff_into(&mut Path::root(), old, new, &mut ops);
    Patch::new(ops)
}

fn diff_into(path: &mut Path, old: &Value, new: &Value, ops: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }
    let (Some(old_fields), Some(new_fields)) = (text_fields(old), text_fields(new)) else {
        ops.push(PatchOp::Set {
            path: path.clone(),
            value: new.clone(),
        });
        return;
    };

    let mut keys: Vec<&str> = old_fields.keys().chain(new_fields.keys()).copied().collect();
    keys.sort_unstable();
    keys.dedup();

    for key in keys {
        path.push(PathToken::Key(key.to_string()));
        match (old_fields.get(key), new_fields.get(key)) {
            (Some(_), None) => ops.push(PatchOp::Remove { path: path.clone() }),
            (None, Some(value)) => ops.push(PatchOp::Set {
                path: path.clone(),
                value: (*value).clone(),
            }),
            (Some(before), Some(after)) => diff_into(path, before, after, ops),
            (None, None) => {}
        }
        path.pop();
    }
}

/// Map fields keyed by text, or `None` if `value` is not a map with only
/// text keys.
fn text_fields(value: &Value) -> Option<BTreeMap<&str, &Value>> {
    value
        .as_map()?
        .iter()
        .map(|(k, v)| k.as_text().map(|k| (k, v)))
        .collect()
}
