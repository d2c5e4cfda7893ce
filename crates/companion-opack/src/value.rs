//! The dynamically-typed value tree OPACK serializes.

/// A decoded or to-be-encoded OPACK value.
///
/// Integer width is carried explicitly on [`Value::UInt`] so that encoding
/// and then decoding a value reproduces the same width, not just the same
/// numeric value (spec invariant (ii)).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `0x04`.
    Null,
    /// `0x01` / `0x02`.
    Bool(bool),
    /// Small unsigned integer in `0..=39`, encoded in the tag byte itself
    /// (`0x08..=0x2F`).
    Int(i64),
    /// Sized unsigned integer (`0x30..=0x33`); `width` is 1, 2, 4, or 8.
    UInt {
        /// Encoded width in bytes.
        width: usize,
        /// The integer's value.
        value: u64,
    },
    /// `0x35`.
    F32(f32),
    /// `0x36`.
    F64(f64),
    /// `0x05`: a 16-byte UUID.
    Uuid([u8; 16]),
    /// `0x06`: an absolute time, decoded as an integer.
    AbsoluteTime(u64),
    /// UTF-8 string (short or long form).
    Str(String),
    /// Byte string (short or long form).
    Bytes(Vec<u8>),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// Ordered string-keyed map. A `Vec` rather than a `HashMap` preserves
    /// insertion order, which matters for encoding determinism and for
    /// mirroring the order a genuine client would send.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Build a string value from anything that converts to `String`.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Build a map value from an iterator of key/value pairs.
    pub fn map(entries: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Borrow this value as a map, if it is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a map value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Borrow this value as a string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow this value as a byte string, if it is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Interpret this value as an integer, if it is an `Int` or `UInt`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            #[allow(clippy::cast_possible_wrap)]
            Self::UInt { value, .. } => Some(*value as i64),
            _ => None,
        }
    }
}
