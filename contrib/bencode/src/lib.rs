//! Bencode: the binary serialization format `BitTorrent` metadata and
//! tracker responses are written in.
//!
//! A bencoded value is one of four things: a signed integer, an opaque byte
//! string, an ordered list of values, or a mapping from byte-string keys to
//! values. Mappings always serialize with their keys in ascending byte
//! order; that ordering is what makes an info-hash reproducible across
//! encoders.

use std::collections::BTreeMap;
use std::fmt;

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

/// A bencoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    #[must_use]
    pub fn bytes<B: Into<Vec<u8>>>(b: B) -> Self {
        Value::Bytes(b.into())
    }

    #[must_use]
    pub fn string(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }

    #[must_use]
    pub fn dict() -> DictBuilder {
        DictBuilder(BTreeMap::new())
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a dictionary entry by a plain ASCII key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict().and_then(|map| map.get(key.as_bytes()))
    }
}

/// A small builder that keeps dictionary construction readable at call
/// sites while still storing keys in the sorted `BTreeMap` the encoder
/// relies on.
#[derive(Default)]
pub struct DictBuilder(BTreeMap<Vec<u8>, Value>);

impl DictBuilder {
    #[must_use]
    pub fn entry(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.as_bytes().to_vec(), value);
        self
    }

    /// Inserts an entry under a raw byte-string key, for dictionaries (such
    /// as a scrape response's `files`) keyed by something that isn't valid
    /// UTF-8, like a 20-byte info-hash.
    #[must_use]
    pub fn entry_bytes(mut self, key: Vec<u8>, value: Value) -> Self {
        self.0.insert(key, value);
        self
    }

    #[must_use]
    pub fn build(self) -> Value {
        Value::Dict(self.0)
    }
}

/// Failures from [`encode`] and [`decode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed bencode input at byte {position}: {reason}")]
    MalformedInput { position: usize, reason: String },

    #[error("value cannot be bencoded: {reason}")]
    UnsupportedValue { reason: String },
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Dict(map) => write!(f, "{{{} keys}}", map.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let value = Value::dict()
            .entry("name", Value::string("file.bin"))
            .entry("length", Value::Int(42))
            .entry("tags", Value::List(vec![Value::string("a"), Value::string("b")]))
            .build();

        let encoded = encode(&value);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn dict_keys_are_sorted_regardless_of_insertion_order() {
        let a = Value::dict().entry("z", Value::Int(1)).entry("a", Value::Int(2)).build();
        let b = Value::dict().entry("a", Value::Int(2)).entry("z", Value::Int(1)).build();
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(encode(&a), b"d1:ai2e1:zi1ee".to_vec());
    }
}
