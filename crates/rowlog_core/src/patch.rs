//! Patches: ordered, path-scoped edits of a record.

use crate::error::{CoreError, CoreResult};
use crate::path::{step_mut, Path, PathToken};
use rowlog_codec::Value;

/// Text stored in place of a redacted value.
pub const REDACTED: &str = "[redacted]";

/// Whether `value` is the redaction marker.
pub fn is_redacted(value: &Value) -> bool {
    value.as_text() == Some(REDACTED)
}

/// A single edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    /// Put `value` at `path`, replacing whatever was there.
    Set {
        /// Target location.
        path: Path,
        /// New value.
        value: Value,
    },
    /// Delete the map key or list element at `path`.
    Remove {
        /// Target location.
        path: Path,
    },
    /// Insert `value` into the list at `path` before position `index`.
    Insert {
        /// Location of the list.
        path: Path,
        /// Position in the list, at most its length.
        index: usize,
        /// Inserted element.
        value: Value,
    },
}

impl PatchOp {
    /// Persisted operation tag.
    pub fn tag(&self) -> &'static str {
        match self {
            PatchOp::Set { .. } => "set",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Insert { .. } => "insert",
        }
    }

    /// Location this operation writes to. For inserts this is the new
    /// element's position, the list path followed by the index.
    pub fn target(&self) -> Path {
        match self {
            PatchOp::Set { path, .. } | PatchOp::Remove { path } => path.clone(),
            PatchOp::Insert { path, index, .. } => path.clone().index(*index),
        }
    }

    /// Value carried by the operation, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            PatchOp::Set { value, .. } | PatchOp::Insert { value, .. } => Some(value),
            PatchOp::Remove { .. } => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut Value> {
        match self {
            PatchOp::Set { value, .. } | PatchOp::Insert { value, .. } => Some(value),
            PatchOp::Remove { .. } => None,
        }
    }

    /// Applies this operation to `target`.
    ///
    /// Operations reaching into a redacted subtree leave it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPatch`] when the path does not fit the
    /// shape of `target`.
    pub fn apply(&self, target: &mut Value) -> CoreResult<()> {
        match self {
            PatchOp::Set { path, value } => {
                let Some((last, parent)) = path.split_last() else {
                    *target = value.clone();
                    return Ok(());
                };
                let Some(parent) = descend(target, parent, path)? else {
                    return Ok(());
                };
                match (last, parent) {
                    (PathToken::Key(k), parent @ Value::Map(_)) => {
                        parent.insert(k.as_str(), value.clone());
                        Ok(())
                    }
                    (PathToken::Index(i), Value::Array(items)) if *i < items.len() => {
                        items[*i] = value.clone();
                        Ok(())
                    }
                    (_, parent) => Err(mismatch(path, parent)),
                }
            }
            PatchOp::Remove { path } => {
                let Some((last, parent)) = path.split_last() else {
                    *target = Value::Null;
                    return Ok(());
                };
                let Some(parent) = descend(target, parent, path)? else {
                    return Ok(());
                };
                let removed = match (last, &mut *parent) {
                    (PathToken::Key(k), parent) => parent.remove(k).is_some(),
                    (PathToken::Index(i), Value::Array(items)) if *i < items.len() => {
                        items.remove(*i);
                        true
                    }
                    _ => false,
                };
                if removed {
                    Ok(())
                } else {
                    Err(mismatch(path, parent))
                }
            }
            PatchOp::Insert { path, index, value } => {
                let Some(list) = descend(target, path.tokens(), path)? else {
                    return Ok(());
                };
                match list {
                    Value::Array(items) if *index <= items.len() => {
                        items.insert(*index, value.clone());
                        Ok(())
                    }
                    other => Err(mismatch(path, other)),
                }
            }
        }
    }
}

/// Walks `tokens` down from `root`. `Ok(None)` means the walk hit a
/// redacted value.
fn descend<'v>(
    root: &'v mut Value,
    tokens: &[PathToken],
    full: &Path,
) -> CoreResult<Option<&'v mut Value>> {
    let mut current = root;
    for token in tokens {
        if is_redacted(current) {
            return Ok(None);
        }
        match step_mut(current, token) {
            Some(next) => current = next,
            None => {
                return Err(CoreError::invalid_patch(
                    full.to_string(),
                    format!("no {token} along path"),
                ))
            }
        }
    }
    Ok(if is_redacted(current) { None } else { Some(current) })
}

fn mismatch(path: &Path, found: &Value) -> CoreError {
    CoreError::invalid_patch(
        path.to_string(),
        format!("cannot apply to {} here", found.kind()),
    )
}

/// An ordered sequence of operations turning one record state into the
/// next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch(Vec<PatchOp>);

impl Patch {
    /// Creates a patch from operations.
    #[must_use]
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self(ops)
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[PatchOp] {
        &self.0
    }

    pub(crate) fn ops_mut(&mut self) -> &mut [PatchOp] {
        &mut self.0
    }

    /// Applies every operation in order.
    ///
    /// # Errors
    ///
    /// Stops at the first operation that does not fit `target`; earlier
    /// operations stay applied.
    pub fn apply(&self, target: &mut Value) -> CoreResult<()> {
        self.0.iter().try_for_each(|op| op.apply(target))
    }
}

impl FromIterator<PatchOp> for Patch {
    fn from_iter<I: IntoIterator<Item = PatchOp>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        Value::object([
            ("name", Value::from("A")),
            ("tags", Value::Array(vec![Value::from("x")])),
            ("address", Value::object([("city", Value::from("Oslo"))])),
        ])
    }

    #[test]
    fn set_replaces_and_adds_keys() {
        let mut r = record();
        Patch::new(vec![
            PatchOp::Set {
                path: Path::from("name"),
                value: Value::from("B"),
            },
            PatchOp::Set {
                path: Path::root().key("address").key("zip"),
                value: Value::from("0150"),
            },
            PatchOp::Set {
                path: Path::root().key("tags").index(0),
                value: Value::from("z"),
            },
        ])
        .apply(&mut r)
        .unwrap();

        assert_eq!(r.get("name"), Some(&Value::from("B")));
        assert_eq!(
            Path::parse("address.zip").unwrap().lookup(&r),
            Some(&Value::from("0150"))
        );
        assert_eq!(r.get("tags"), Some(&Value::Array(vec![Value::from("z")])));
    }

    #[test]
    fn remove_and_insert() {
        let mut r = record();
        PatchOp::Remove {
            path: Path::from("name"),
        }
        .apply(&mut r)
        .unwrap();
        PatchOp::Insert {
            path: Path::from("tags"),
            index: 0,
            value: Value::from("w"),
        }
        .apply(&mut r)
        .unwrap();
        PatchOp::Insert {
            path: Path::from("tags"),
            index: 2,
            value: Value::from("y"),
        }
        .apply(&mut r)
        .unwrap();

        assert_eq!(r.get("name"), None);
        assert_eq!(
            r.get("tags"),
            Some(&Value::Array(vec![
                Value::from("w"),
                Value::from("x"),
                Value::from("y")
            ]))
        );
    }

    #[test]
    fn root_set_replaces_everything() {
        let mut r = record();
        PatchOp::Set {
            path: Path::root(),
            value: Value::Integer(1),
        }
        .apply(&mut r)
        .unwrap();
        assert_eq!(r, Value::Integer(1));
    }

    #[test]
    fn shape_mismatches_are_errors() {
        let mut r = record();
        let bad = [
            PatchOp::Remove {
                path: Path::from("missing"),
            },
            PatchOp::Set {
                path: Path::root().key("missing").key("x"),
                value: Value::Null,
            },
            PatchOp::Set {
                path: Path::root().key("tags").index(5),
                value: Value::Null,
            },
            PatchOp::Insert {
                path: Path::from("name"),
                index: 0,
                value: Value::Null,
            },
            PatchOp::Insert {
                path: Path::from("tags"),
                index: 3,
                value: Value::Null,
            },
        ];
        for op in bad {
            assert!(
                matches!(op.apply(&mut r), Err(CoreError::InvalidPatch { .. })),
                "{op:?} should not apply"
            );
        }
        assert_eq!(r, record());
    }

    #[test]
    fn redacted_subtrees_are_opaque() {
        let mut r = Value::object([("user", Value::from(REDACTED))]);
        let ops = Patch::new(vec![
            PatchOp::Set {
                path: Path::root().key("user").key("ssn"),
                value: Value::from("123"),
            },
            PatchOp::Remove {
                path: Path::root().key("user").key("name"),
            },
        ]);
        ops.apply(&mut r).unwrap();
        assert_eq!(r, Value::object([("user", Value::from(REDACTED))]));
    }

    #[test]
    fn insert_target_includes_index() {
        let op = PatchOp::Insert {
            path: Path::from("tags"),
            index: 3,
            value: Value::Null,
        };
        assert_eq!(op.target(), Path::root().key("tags").index(3));
        assert_eq!(op.tag(), "insert");
    }
}
