//! Canonical CBOR encoder.

use crate::value::Value;

/// Encode a value to canonical CBOR bytes.
///
/// Output is deterministic (RFC 8949 Section 4.2.1):
/// - Map keys are sorted by their encoded form (length-first, then bytewise)
/// - Integers use the shortest possible encoding
/// - No indefinite-length encoding
///
/// Every [`Value`] has a canonical encoding, so this cannot fail.
pub fn to_canonical_cbor(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::with_capacity(value.encoded_len());
    encoder.encode(value);
    encoder.into_bytes()
}

/// Returns the encoded length (header plus argument) of a CBOR unsigned
/// argument.
pub(crate) fn uint_header_len(n: u64) -> usize {
    if n < 24 {
        1
    } else if n <= 0xFF {
        2
    } else if n <= 0xFFFF {
        3
    } else if n <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// A canonical CBOR encoder writing into an owned buffer.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value, appending it to the buffer.
    pub fn encode(&mut self, value: &Value) {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(false) => self.buffer.push(0xf4),
            Value::Bool(true) => self.buffer.push(0xf5),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Bytes(b) => {
                self.encode_unsigned(2, b.len() as u64);
                self.buffer.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.encode_unsigned(3, s.len() as u64);
                self.buffer.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                self.encode_unsigned(4, items.len() as u64);
                for item in items {
                    self.encode(item);
                }
            }
            Value::Map(pairs) => self.encode_map(pairs),
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // Major type 1 carries -(n+1), which is in [0, 2^63-1].
            self.encode_unsigned(1, (-(n + 1)) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        match uint_header_len(value) {
            1 => self.buffer.push(mt | value as u8),
            2 => {
                self.buffer.push(mt | 24);
                self.buffer.push(value as u8);
            }
            3 => {
                self.buffer.push(mt | 25);
                self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
            }
            5 => {
                self.buffer.push(mt | 26);
                self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
            }
            _ => {
                self.buffer.push(mt | 27);
                self.buffer.extend_from_slice(&value.to_be_bytes());
            }
        }
    }

    fn encode_map(&mut self, pairs: &[(Value, Value)]) {
        // Maps built through `Value::map` are already sorted, but a
        // hand-built `Value::Map` may not be. Of repeated keys the last
        // pair wins, as in `Value::map`.
        let mut encoded: Vec<(Vec<u8>, &Value)> = pairs
            .iter()
            .map(|(k, v)| (to_canonical_cbor(k), v))
            .collect();
        encoded.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));
        let mut unique: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(encoded.len());
        for pair in encoded {
            match unique.last_mut() {
                Some(last) if last.0 == pair.0 => *last = pair,
                _ => unique.push(pair),
            }
        }

        self.encode_unsigned(5, unique.len() as u64);
        for (key, value) in unique {
            self.buffer.extend_from_slice(&key);
            self.encode(value);
        }
    }
}
