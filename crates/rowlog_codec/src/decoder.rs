//! Strict canonical CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Decode exactly one canonical value from CBOR bytes.
///
/// Anything an encoder could not have produced is rejected, which makes
/// `to_canonical_cbor(&from_cbor(b)?) == b` hold for all accepted input.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR, contain constructs
/// outside the [`Value`] model (floats, tags, `undefined`), use a
/// non-canonical form, or carry trailing bytes.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// Largest array or map accepted.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Longest byte or text string accepted.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// Maximum nesting depth of arrays and maps.
const MAX_DEPTH: usize = 256;

/// A canonical CBOR decoder over a borrowed buffer.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Decoder positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Decode the next value.
    ///
    /// # Errors
    ///
    /// See [`from_cbor`].
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial_byte = self.read_byte()?;
        let major_type = initial_byte >> 5;
        let info = initial_byte & 0x1f;

        match major_type {
            0 => {
                let n = self.read_argument(info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            1 => {
                let n = self.read_argument(info)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(-1 - n))
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            2 => {
                let len = self.read_length(info, MAX_BYTES_LENGTH)?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            3 => {
                let len = self.read_length(info, MAX_BYTES_LENGTH)?;
                let bytes = self.read_bytes(len)?;
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            4 => {
                let len = self.read_length(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|d| {
                    // Each element takes at least one byte.
                    let mut items = Vec::with_capacity(len.min(d.remaining().len()));
                    for _ in 0..len {
                        items.push(d.decode()?);
                    }
                    Ok(Value::Array(items))
                })
            }
            5 => {
                let len = self.read_length(info, MAX_CONTAINER_ELEMENTS)?;
                self.nested(|d| d.decode_map_body(len))
            }
            6 => Err(CodecError::unsupported_type("tagged value")),
            _ => self.decode_simple(info),
        }
    }

    /// True once every input byte has been read.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Unread input.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::invalid_structure("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_length(&mut self, info: u8, max_allowed: u64) -> CodecResult<usize> {
        let claimed = self.read_argument(info)?;
        if claimed > max_allowed {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::IntegerOverflow)
    }

    fn read_argument(&mut self, info: u8) -> CodecResult<u64> {
        let (value, min) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (u64::from(self.read_byte()?), 24),
            25 => {
                let b = self.read_bytes(2)?;
                (u64::from(u16::from_be_bytes([b[0], b[1]])), 0x100)
            }
            26 => {
                let b = self.read_bytes(4)?;
                (
                    u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
                    0x1_0000,
                )
            }
            27 => {
                let b = self.read_bytes(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(b);
                (u64::from_be_bytes(buf), 0x1_0000_0000)
            }
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };
        if value < min {
            return Err(CodecError::non_canonical(
                "value could be encoded in fewer bytes",
            ));
        }
        Ok(value)
    }

    fn decode_map_body(&mut self, len: usize) -> CodecResult<Value> {
        let mut pairs = Vec::with_capacity(len.min(self.remaining().len()));
        let data = self.data;
        let mut prev_key: Option<&'a [u8]> = None;

        for _ in 0..len {
            let key_start = self.pos;
            let key = self.decode()?;
            let key_bytes = &data[key_start..self.pos];

            if let Some(prev) = prev_key {
                let ordering = prev.len().cmp(&key_bytes.len()).then_with(|| prev.cmp(key_bytes));
                if ordering != Ordering::Less {
                    return Err(CodecError::non_canonical(
                        "map keys not in strictly increasing order",
                    ));
                }
            }
            prev_key = Some(key_bytes);

            let value = self.decode()?;
            pairs.push((key, value));
        }

        Ok(Value::Map(pairs))
    }

    fn decode_simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            23 => Err(CodecError::unsupported_type("undefined")),
            25..=27 => Err(CodecError::FloatForbidden),
            31 => Err(CodecError::invalid_structure("break without indefinite item")),
            other => Err(CodecError::unsupported_type(format!("simple value {other}"))),
        }
    }
}
