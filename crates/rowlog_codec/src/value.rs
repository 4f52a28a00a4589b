//! Dynamic document value type.

use crate::encoder::{to_canonical_cbor, uint_header_len};
use crate::error::{CodecError, CodecResult};
use std::cmp::Ordering;

/// A dynamic document value.
///
/// Records and history logs are both trees of `Value`s. Floats are not
/// representable, which keeps every value encodable in exactly one
/// canonical byte form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer; record integers are limited to i64.
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs, kept sorted by canonical key order.
    ///
    /// Built with [`Value::map`] or [`Value::object`]. A map assembled by
    /// hand may be out of order; [`Value::into_canonical`] fixes it.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a map, putting the keys in canonical order.
    ///
    /// Keys are sorted by their canonical CBOR encoding. When a key appears
    /// more than once the last pair wins.
    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        let mut sorted: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            insert_sorted(&mut sorted, key, value);
        }
        Value::Map(sorted)
    }

    /// Create a map with text keys, the usual shape of a record.
    ///
    /// ```
    /// use rowlog_codec::Value;
    ///
    /// let record = Value::object([("name", Value::from("A")), ("age", Value::from(3))]);
    /// assert_eq!(record.get("name"), Some(&Value::from("A")));
    /// ```
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Compare two values by canonical ordering.
    ///
    /// Values are ordered by their canonical encodings, shorter encodings
    /// first and bytewise otherwise. This is the order map keys are stored
    /// and encoded in.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Fast path for the overwhelmingly common text keys.
            (Value::Text(a), Value::Text(b)) => {
                let len_a = uint_header_len(a.len() as u64) + a.len();
                let len_b = uint_header_len(b.len() as u64) + b.len();
                len_a.cmp(&len_b).then_with(|| a.as_bytes().cmp(b.as_bytes()))
            }
            _ => {
                let a = to_canonical_cbor(self);
                let b = to_canonical_cbor(other);
                a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
            }
        }
    }

    /// Whether every map in this value, at any depth, has strictly
    /// increasing keys.
    pub fn is_canonical(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().all(Value::is_canonical),
            Value::Map(pairs) => {
                pairs
                    .windows(2)
                    .all(|w| w[0].0.cmp_canonical(&w[1].0) == Ordering::Less)
                    && pairs.iter().all(|(k, v)| k.is_canonical() && v.is_canonical())
            }
            _ => true,
        }
    }

    /// Sorts every map in this value into canonical key order.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NonCanonical`] if a map holds the same key
    /// twice.
    pub fn into_canonical(self) -> CodecResult<Value> {
        match self {
            Value::Array(items) => items
                .into_iter()
                .map(Value::into_canonical)
                .collect::<CodecResult<Vec<_>>>()
                .map(Value::Array),
            Value::Map(pairs) => {
                let mut pairs = pairs
                    .into_iter()
                    .map(|(k, v)| -> CodecResult<(Value, Value)> {
                        Ok((k.into_canonical()?, v.into_canonical()?))
                    })
                    .collect::<CodecResult<Vec<_>>>()?;
                pairs.sort_by(|(a, _), (b, _)| a.cmp_canonical(b));
                if let Some(w) = pairs
                    .windows(2)
                    .find(|w| w[0].0.cmp_canonical(&w[1].0) == Ordering::Equal)
                {
                    return Err(CodecError::non_canonical(format!(
                        "duplicate map key {:?}",
                        w[0].0
                    )));
                }
                Ok(Value::Map(pairs))
            }
            other => Ok(other),
        }
    }

    /// Returns the length of this value's canonical encoding in bytes.
    ///
    /// Exact for values where [`Value::is_canonical`] holds.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Null | Value::Bool(_) => 1,
            #[allow(clippy::cast_sign_loss)]
            Value::Integer(n) if *n >= 0 => uint_header_len(*n as u64),
            #[allow(clippy::cast_sign_loss)]
            Value::Integer(n) => uint_header_len((-(n + 1)) as u64),
            Value::Bytes(b) => uint_header_len(b.len() as u64) + b.len(),
            Value::Text(s) => uint_header_len(s.len() as u64) + s.len(),
            Value::Array(items) => {
                uint_header_len(items.len() as u64)
                    + items.iter().map(Value::encoded_len).sum::<usize>()
            }
            Value::Map(pairs) => {
                uint_header_len(pairs.len() as u64)
                    + pairs
                        .iter()
                        .map(|(k, v)| k.encoded_len() + v.encoded_len())
                        .sum::<usize>()
            }
        }
    }

    /// Short name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The byte string, if this is `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The text, if this is `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The items, if this is `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The pairs in canonical order, if this is `Map`.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Mutable lookup of a text key in this map value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter_mut()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Inserts a key into this map value, keeping canonical key order.
    ///
    /// Returns the previous value for the key. Returns `None` without
    /// inserting if this value is not a map.
    pub fn insert(&mut self, key: impl Into<Value>, value: Value) -> Option<Value> {
        match self {
            Value::Map(pairs) => insert_sorted(pairs, key.into(), value),
            _ => None,
        }
    }

    /// Removes a text key from this map value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Value::Map(pairs) => {
                let idx = pairs.iter().position(|(k, _)| k.as_text() == Some(key))?;
                Some(pairs.remove(idx).1)
            }
            _ => None,
        }
    }
}

fn insert_sorted(pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Option<Value> {
    match pairs.binary_search_by(|(k, _)| k.cmp_canonical(&key)) {
        Ok(idx) => Some(std::mem::replace(&mut pairs[idx].1, value)),
        Err(idx) => {
            pairs.insert(idx, (key, value));
            None
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keys_are_sorted_length_first() {
        let map = Value::map(vec![
            (Value::from("abc"), Value::Integer(1)),
            (Value::from("b"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(3)),
        ]);

        let keys: Vec<_> = map
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_text().unwrap())
            .collect();
        assert_eq!(keys, vec!["a", "b", "abc"]);
    }

    #[test]
    fn map_duplicate_keys_last_wins() {
        let map = Value::map(vec![
            (Value::from("a"), Value::Integer(1)),
            (Value::from("a"), Value::Integer(2)),
        ]);
        assert_eq!(map.as_map().unwrap().len(), 1);
        assert_eq!(map.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn hand_built_maps_are_sorted() {
        let shuffled = Value::Map(vec![
            (Value::from("c"), Value::Integer(1)),
            (
                Value::from("b"),
                Value::Array(vec![Value::Map(vec![
                    (Value::from("z"), Value::Null),
                    (Value::from("y"), Value::Null),
                ])]),
            ),
            (Value::from("a"), Value::Integer(3)),
        ]);
        assert!(!shuffled.is_canonical());

        let sorted = shuffled.into_canonical().unwrap();
        assert!(sorted.is_canonical());
        assert_eq!(
            sorted,
            Value::object([
                ("a", Value::Integer(3)),
                (
                    "b",
                    Value::Array(vec![Value::object([("y", Value::Null), ("z", Value::Null)])]),
                ),
                ("c", Value::Integer(1)),
            ])
        );
        assert_eq!(from_cbor_roundtrip(&sorted), sorted);
    }

    #[test]
    fn duplicate_keys_cannot_be_canonical() {
        let twice = Value::Map(vec![
            (Value::from("a"), Value::Integer(1)),
            (Value::from("a"), Value::Integer(2)),
        ]);
        assert!(!twice.is_canonical());
        assert!(matches!(
            twice.into_canonical(),
            Err(CodecError::NonCanonical { .. })
        ));
    }

    fn from_cbor_roundtrip(value: &Value) -> Value {
        crate::from_cbor(&to_canonical_cbor(value)).unwrap()
    }

    #[test]
    fn integer_ordering() {
        let mut values = vec![
            Value::Integer(-1),
            Value::Integer(0),
            Value::Integer(300),
            Value::Integer(-2),
            Value::Integer(2),
        ];
        values.sort_by(Value::cmp_canonical);

        assert_eq!(
            values,
            vec![
                Value::Integer(0),
                Value::Integer(2),
                Value::Integer(-1),
                Value::Integer(-2),
                Value::Integer(300),
            ]
        );
    }

    #[test]
    fn encoded_len_matches_encoder() {
        let value = Value::object([
            ("name", Value::from("Alice")),
            ("age", Value::Integer(300)),
            ("neg", Value::Integer(-1000)),
            (
                "tags",
                Value::Array(vec![Value::from("x"), Value::Bytes(vec![0; 30])]),
            ),
            ("nested", Value::object([("ok", Value::Bool(true))])),
            ("none", Value::Null),
        ]);
        assert_eq!(value.encoded_len(), to_canonical_cbor(&value).len());
    }

    #[test]
    fn insert_and_remove_keep_order() {
        let mut record = Value::object([("b", Value::Integer(1))]);
        assert_eq!(record.insert("a", Value::Integer(2)), None);
        assert_eq!(
            record.insert("b", Value::Integer(3)),
            Some(Value::Integer(1))
        );
        assert_eq!(record.as_map().unwrap()[0].0, Value::from("a"));

        assert_eq!(record.remove("a"), Some(Value::Integer(2)));
        assert_eq!(record.remove("a"), None);
        assert_eq!(record.get("b"), Some(&Value::Integer(3)));
    }

    #[test]
    fn insert_on_non_map_is_ignored() {
        let mut value = Value::Integer(1);
        assert_eq!(value.insert("a", Value::Null), None);
        assert_eq!(value, Value::Integer(1));
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::from("hello").as_text(), Some("hello"));
        assert_eq!(Value::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
        assert_eq!(Value::Array(vec![]).kind(), "array");
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(42u32), Value::Integer(42));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
        assert_eq!(Value::from(()), Value::Null);
    }
}
