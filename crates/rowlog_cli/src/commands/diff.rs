//! Diff command implementation.

use super::{load_log, CommandResult};
use crate::json::to_json;
use rowlog_core::{diff, reconstruct_version, CoreResult, Patch, PatchOp, VersionLog};
use serde_json::{json, Value as Json};
use std::path::Path;

/// Runs the diff command.
pub fn run(path: &Path, from: u64, to: u64, format: &str) -> CommandResult<()> {
    let (_, log) = load_log(path)?;
    let patch = between(&log, from, to)?;

    match format {
        "json" => {
            let ops: Vec<Json> = patch.ops().iter().map(op_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&ops)?);
        }
        _ => {
            println!("version {from} -> version {to}: {} ops", patch.len());
            for op in patch.ops() {
                println!("  {}", describe(op));
            }
        }
    }
    Ok(())
}

/// Patch from version `from` to version `to`.
pub fn between(log: &VersionLog, from: u64, to: u64) -> CoreResult<Patch> {
    let before = reconstruct_version(log, from)?;
    let after = reconstruct_version(log, to)?;
    Ok(diff(&before, &after))
}

/// One-line description of an operation.
pub fn describe(op: &PatchOp) -> String {
    match op {
        PatchOp::Set { path, value } => format!("set {path} = {}", to_json(value)),
        PatchOp::Remove { path } => format!("remove {path}"),
        PatchOp::Insert { path, index, value } => {
            format!("insert {path}[{index}] = {}", to_json(value))
        }
    }
}

fn op_to_json(op: &PatchOp) -> Json {
    let mut fields = json!({ "op": op.tag(), "path": op.target().to_string() });
    if let Some(value) = op.value() {
        fields["value"] = to_json(value);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlog_core::{log, Path as RecordPath};
    use rowlog_codec::Value;
    use rowlog_testkit::prelude::*;

    #[test]
    fn scenario_diff() {
        let log = log::decode(&scenario_log_bytes()).unwrap();
        let patch = between(&log, 0, 1).unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(describe(&patch.ops()[0]), r#"set name = "B""#);
        assert!(between(&log, 1, 1).unwrap().is_empty());
        assert!(between(&log, 0, 3).is_err());
    }

    #[test]
    fn descriptions() {
        let path = RecordPath::parse("tags").unwrap();
        assert_eq!(describe(&PatchOp::Remove { path: path.clone() }), "remove tags");
        let insert = PatchOp::Insert {
            path,
            index: 1,
            value: Value::from("y"),
        };
        assert_eq!(describe(&insert), r#"insert tags[1] = "y""#);
        assert_eq!(
            op_to_json(&insert),
            json!({"op": "insert", "path": "tags[1]", "value": "y"})
        );
    }

    #[test]
    fn run_prints_both_formats() {
        let files = TempFiles::new();
        let path = files.write("row.cbor", scenario_log_bytes());
        run(&path, 0, 1, "text").unwrap();
        run(&path, 1, 0, "json").unwrap();
    }
}
