//! OPACK: Apple's tagged binary serialization used by the Companion
//! protocol's `U_OPACK`/`E_OPACK`/`P_OPACK` frames.
//!
//! Every value's first byte encodes both its type and, for short forms,
//! its length. Previously emitted values longer than one byte are
//! deduplicated via back-references, the way a format with an object
//! table (rather than a grammar) keeps both encode and decode linear in
//! the input size.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod tags;
mod value;

mod decode;
mod encode;

pub use value::Value;

use thiserror::Error;

/// Errors produced while encoding or decoding an OPACK value tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpackError {
    /// Input ended where a value was expected.
    #[error("unexpected end of input")]
    Eof,

    /// The first byte of a value did not match any tag this codec supports.
    #[error("unsupported tag byte {0:#04x}")]
    UnsupportedTag(u8),

    /// A string value's bytes were not valid UTF-8.
    #[error("invalid utf-8 string")]
    InvalidUtf8,

    /// A back-reference pointed outside the decode table's bounds, or at
    /// an index not yet defined at this point in the stream.
    #[error("back-reference index {0} is undefined")]
    UndefinedBackReference(usize),

    /// An "endless" array or map never reached its `0x03` terminator.
    #[error("endless collection missing terminator")]
    MissingTerminator,

    /// A map key was not a UTF-8 string, which OPACK requires.
    #[error("map keys must be strings")]
    NonStringMapKey,
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, OpackError>;

/// Encode a value tree to its OPACK byte representation.
#[must_use]
pub fn pack(value: &Value) -> Vec<u8> {
    let mut encoder = encode::Encoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// Decode an OPACK byte stream into a value tree.
///
/// # Errors
///
/// Returns an [`OpackError`] if the stream is truncated, names an
/// unsupported tag, or contains a malformed back-reference.
pub fn unpack(bytes: &[u8]) -> Result<Value> {
    let mut decoder = decode::Decoder::new(bytes);
    let value = decoder.decode()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn small_int_zero_and_max_short_form() {
        assert_eq!(pack(&Value::Int(0)), vec![0x08]);
        assert_eq!(pack(&Value::Int(0x27)), vec![0x2F]);
    }

    #[test]
    fn back_reference_example_from_spec() {
        let value = Value::Array(vec![
            Value::string("foo"),
            Value::string("bar"),
            Value::string("foo"),
            Value::string("bar"),
        ]);
        let encoded = pack(&value);
        assert_eq!(
            encoded,
            vec![
                0xD4, 0x43, b'f', b'o', b'o', 0x43, b'b', b'a', b'r', 0xA0, 0xA1
            ]
        );
        assert_eq!(unpack(&encoded).unwrap(), value);
    }

    #[test]
    fn booleans_and_null_round_trip() {
        for v in [Value::Bool(true), Value::Bool(false), Value::Null] {
            assert_eq!(unpack(&pack(&v)).unwrap(), v);
        }
    }

    #[test]
    fn uuid_round_trips() {
        let v = Value::Uuid([0x42; 16]);
        assert_eq!(unpack(&pack(&v)).unwrap(), v);
    }

    #[test]
    fn floats_round_trip() {
        assert_eq!(unpack(&pack(&Value::F32(1.5))).unwrap(), Value::F32(1.5));
        assert_eq!(
            unpack(&pack(&Value::F64(-2.25))).unwrap(),
            Value::F64(-2.25)
        );
    }

    #[test]
    fn sized_uint_round_trips_preserve_width() {
        for (width, value) in [
            (1usize, 0x42u64),
            (2, 0x1234),
            (4, 0x1234_5678),
            (8, 0x1234_5678_9ABC_DEF0),
        ] {
            let v = Value::UInt { width, value };
            let decoded = unpack(&pack(&v)).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn long_string_round_trips() {
        let s = "x".repeat(100_000);
        let v = Value::string(&s);
        assert_eq!(unpack(&pack(&v)).unwrap(), v);
    }

    #[test]
    fn long_bytes_round_trip() {
        let b = vec![0xABu8; 70_000];
        let v = Value::Bytes(b);
        assert_eq!(unpack(&pack(&v)).unwrap(), v);
    }

    #[test]
    fn thirty_two_byte_string_uses_the_short_form() {
        // 0x60 is the last short-string tag (len 0x60 - 0x40 = 32); a
        // 33-byte string is the first to need the long form.
        let s = "x".repeat(32);
        let encoded = pack(&Value::string(&s));
        assert_eq!(encoded[0], 0x60);
        assert_eq!(unpack(&encoded).unwrap(), Value::string(&s));

        let s = "x".repeat(33);
        let encoded = pack(&Value::string(&s));
        assert_eq!(encoded[0], 0x61);
        assert_eq!(unpack(&encoded).unwrap(), Value::string(&s));
    }

    #[test]
    fn thirty_two_byte_bytes_uses_the_short_form() {
        // 0x90 is the last short-bytes tag (len 0x90 - 0x70 = 32); a
        // 33-byte string is the first to need the long form.
        let b = vec![0xABu8; 32];
        let encoded = pack(&Value::Bytes(b.clone()));
        assert_eq!(encoded[0], 0x90);
        assert_eq!(unpack(&encoded).unwrap(), Value::Bytes(b));

        let b = vec![0xABu8; 33];
        let encoded = pack(&Value::Bytes(b.clone()));
        assert_eq!(encoded[0], 0x91);
        assert_eq!(unpack(&encoded).unwrap(), Value::Bytes(b));
    }

    #[test]
    fn map_round_trips_with_string_keys() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Int(1));
        map.insert("b".to_string(), Value::string("hi"));
        let v = Value::Map(map.into_iter().collect());
        assert_eq!(unpack(&pack(&v)).unwrap(), v);
    }

    #[test]
    fn endless_array_round_trips() {
        // 16 items forces the encoder's fixed-count form (0x0F max nibble)
        // to overflow into the endless form.
        let items: Vec<Value> = (0..16).map(Value::Int).collect();
        let v = Value::Array(items);
        let encoded = pack(&v);
        assert_eq!(encoded[0], 0xDF);
        assert_eq!(*encoded.last().unwrap(), 0x03);
        assert_eq!(unpack(&encoded).unwrap(), v);
    }

    #[test]
    fn endless_map_round_trips() {
        let entries: Vec<(String, Value)> =
            (0..16).map(|i| (format!("k{i}"), Value::Int(i))).collect();
        let v = Value::Map(entries);
        let encoded = pack(&v);
        assert_eq!(encoded[0], 0xEF);
        assert_eq!(*encoded.last().unwrap(), 0x03);
        assert_eq!(unpack(&encoded).unwrap(), v);
    }

    #[test]
    fn composites_are_never_back_referenced() {
        let inner = Value::Array(vec![Value::Int(1)]);
        let v = Value::Array(vec![inner.clone(), inner]);
        let encoded = pack(&v);
        // Two identical nested arrays must each be encoded in full; the
        // spec forbids indexing composites.
        assert!(!encoded.iter().any(|&b| (0xA0..=0xC0).contains(&b)));
        assert_eq!(unpack(&encoded).unwrap(), v);
    }

    #[test]
    fn one_byte_primitives_are_never_back_referenced() {
        let v = Value::Array(vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::Null,
            Value::Null,
        ]);
        let encoded = pack(&v);
        assert!(!encoded.iter().any(|&b| (0xA0..=0xC0).contains(&b)));
        assert_eq!(unpack(&encoded).unwrap(), v);
    }

    #[test]
    fn unsupported_tag_is_a_fatal_decode_error() {
        assert_eq!(unpack(&[0xFF]), Err(OpackError::UnsupportedTag(0xFF)));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_arbitrary_int_and_string_trees(
            v in arbitrary_value(4)
        ) {
            let encoded = pack(&v);
            prop_assert_eq!(unpack(&encoded).unwrap(), v);
        }
    }

    fn arbitrary_value(depth: u32) -> BoxedStrategy<Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (0i64..40).prop_map(Value::Int),
            any::<String>().prop_map(|s| Value::string(&s)),
            prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
        ];

        if depth == 0 {
            leaf.boxed()
        } else {
            let smaller = arbitrary_value(depth - 1);
            prop_oneof![
                leaf,
                prop::collection::vec(smaller.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec((any::<String>(), smaller), 0..4).prop_map(|pairs| {
                    // Dedup keys: map decode order is insertion order,
                    // and a duplicate key would make this a lossy,
                    // not unequal, transform.
                    let mut seen = std::collections::HashSet::new();
                    Value::Map(
                        pairs
                            .into_iter()
                            .filter(|(k, _)| seen.insert(k.clone()))
                            .collect(),
                    )
                }),
            ]
            .boxed()
        }
    }
}
