//! Benchmark utilities.

use rand::Rng;
use rowlog_codec::Value;
use rowlog_core::{capture, CaptureConfig, CaptureInput, Record};

/// A record with `fields` text fields and a short tag list.
pub fn wide_record(fields: usize) -> Record {
    let mut pairs: Vec<(String, Value)> = (0..fields)
        .map(|i| (format!("field_{i}"), Value::Text(format!("value {i}"))))
        .collect();
    pairs.push((
        "tags".to_string(),
        Value::Array(vec![Value::from("a"), Value::from("b")]),
    ));
    Value::object(pairs)
}

/// `record` with `changes` randomly chosen fields rewritten.
pub fn mutate(record: &Record, fields: usize, changes: usize) -> Record {
    let mut rng = rand::thread_rng();
    let mut next = record.clone();
    for _ in 0..changes {
        let key = format!("field_{}", rng.gen_range(0..fields.max(1)));
        next.insert(key, Value::Integer(rng.gen()));
    }
    next
}

/// Log bytes after `writes` random updates to a record of `fields` fields.
///
/// # Panics
///
/// Panics if a capture fails.
pub fn history_bytes(fields: usize, writes: usize, config: &CaptureConfig) -> (Record, Vec<u8>) {
    let mut record = wide_record(fields);
    let mut bytes = Vec::new();
    for ts in 0..writes {
        let next = mutate(&record, fields, 2);
        let input = CaptureInput::new(&record, &next, ts as i64).existing_log(&bytes);
        bytes = capture(&input, config).expect("capture");
        record = next;
    }
    (record, bytes)
}
