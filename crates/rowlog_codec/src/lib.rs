//! # rowlog codec
//!
//! The document type shared by records and their embedded history logs,
//! and its canonical CBOR form.
//!
//! A canonical form is what lets a history log sit next to the record's
//! own data in the same column and still compare byte-for-byte:
//! - Identical values produce identical bytes
//! - Decoding accepts only canonical bytes, so decode/encode is lossless
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (length-first, then bytewise on encoded keys)
//! - Integers use shortest encoding and fit in i64
//! - No floats, tags, `undefined` or indefinite-length items
//! - Strings must be UTF-8
//! - Exactly one top-level item, no trailing bytes
//!
//! ## Usage
//!
//! ```
//! use rowlog_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let record = Value::object([("name", Value::from("A")), ("tags", Value::Array(vec![]))]);
//! let bytes = to_canonical_cbor(&record);
//! assert_eq!(from_cbor(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;
