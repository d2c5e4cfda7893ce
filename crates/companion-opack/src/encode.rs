//! OPACK encoding: serializes a [`Value`] tree, emitting back-references
//! for any non-composite value whose encoding has already been seen.

use std::collections::HashMap;

use crate::{
    Value,
    tags::{self, SHORT_BACKREF_LIMIT},
};

pub(crate) struct Encoder {
    out: Vec<u8>,
    /// Encodings eligible for back-reference, in first-seen order.
    table: Vec<Vec<u8>>,
    /// Maps an encoding to its index in `table`, for O(1) dedup lookup.
    index: HashMap<Vec<u8>, usize>,
}

impl Encoder {
    pub(crate) fn new() -> Self {
        Self {
            out: Vec::new(),
            table: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    pub(crate) fn encode(&mut self, value: &Value) {
        if is_composite(value) {
            self.encode_composite(value);
            return;
        }

        let standalone = encode_standalone(value);
        if standalone.len() <= 1 {
            // Never indexed: booleans, null, small ints, and the empty
            // string/bytes forms all encode to a single byte.
            self.out.extend_from_slice(&standalone);
            return;
        }

        if let Some(&idx) = self.index.get(&standalone) {
            self.emit_back_ref(idx);
            return;
        }

        self.out.extend_from_slice(&standalone);
        self.index.insert(standalone.clone(), self.table.len());
        self.table.push(standalone);
    }

    fn encode_composite(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                if items.len() <= 0x0E {
                    self.out.push(tags::ARRAY_START + items.len() as u8);
                    for item in items {
                        self.encode(item);
                    }
                } else {
                    self.out.push(tags::ENDLESS_ARRAY);
                    for item in items {
                        self.encode(item);
                    }
                    self.out.push(tags::TERMINATOR);
                }
            }
            Value::Map(entries) => {
                if entries.len() <= 0x0E {
                    self.out.push(tags::MAP_START + entries.len() as u8);
                    for (key, value) in entries {
                        self.encode(&Value::string(key.clone()));
                        self.encode(value);
                    }
                } else {
                    self.out.push(tags::ENDLESS_MAP);
                    for (key, value) in entries {
                        self.encode(&Value::string(key.clone()));
                        self.encode(value);
                    }
                    self.out.push(tags::TERMINATOR);
                }
            }
            _ => unreachable!("encode_composite called on a non-composite value"),
        }
    }

    fn emit_back_ref(&mut self, index: usize) {
        if index < SHORT_BACKREF_LIMIT {
            self.out.push(tags::BACKREF_START + index as u8);
            return;
        }
        let width = uint_width_for(index as u64);
        self.out.push(tags::LONG_BACKREF_START + (width as u8 - 1));
        self.out.extend_from_slice(&index.to_le_bytes()[..width]);
    }
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Map(_))
}

/// Encode a non-composite value's standalone bytes, independent of any
/// back-reference decision (used both as the emitted form and the table
/// dedup key).
fn encode_standalone(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => vec![tags::NULL],
        Value::Bool(true) => vec![tags::TRUE],
        Value::Bool(false) => vec![tags::FALSE],
        Value::Int(n) if (0..=39).contains(n) => vec![tags::SMALL_INT_START + *n as u8],
        Value::Int(n) => {
            // Outside the tag-encodable small-int range; degrade to the
            // smallest sized uint that fits rather than producing an
            // invalid byte.
            #[allow(clippy::cast_sign_loss)]
            let value = *n as u64;
            encode_sized_uint(uint_width_for(value), value)
        }
        Value::UInt { width, value } => encode_sized_uint(*width, *value),
        Value::F32(f) => {
            let mut bytes = vec![tags::F32_TAG];
            bytes.extend_from_slice(&f.to_le_bytes());
            bytes
        }
        Value::F64(f) => {
            let mut bytes = vec![tags::F64_TAG];
            bytes.extend_from_slice(&f.to_le_bytes());
            bytes
        }
        Value::Uuid(bytes) => {
            let mut out = vec![tags::UUID];
            out.extend_from_slice(bytes);
            out
        }
        Value::AbsoluteTime(value) => {
            let mut bytes = vec![tags::ABSOLUTE_TIME];
            bytes.extend_from_slice(&value.to_le_bytes());
            bytes
        }
        Value::Str(s) => encode_str(s),
        Value::Bytes(b) => encode_bytes(b),
        Value::Array(_) | Value::Map(_) => {
            unreachable!("composites never go through encode_standalone")
        }
    }
}

fn encode_sized_uint(width: usize, value: u64) -> Vec<u8> {
    let mut bytes = vec![tags::sized_uint_tag(width)];
    bytes.extend_from_slice(&value.to_le_bytes()[..width]);
    bytes
}

fn encode_str(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    if bytes.len() <= (tags::SHORT_STRING_END - tags::SHORT_STRING_START) as usize {
        let mut out = vec![tags::SHORT_STRING_START + bytes.len() as u8];
        out.extend_from_slice(bytes);
        return out;
    }
    let width = string_len_width(bytes.len() as u64);
    let mut out = vec![tags::long_string_tag(width)];
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes()[..width]);
    out.extend_from_slice(bytes);
    out
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() <= (tags::SHORT_BYTES_END - tags::SHORT_BYTES_START) as usize {
        let mut out = vec![tags::SHORT_BYTES_START + bytes.len() as u8];
        out.extend_from_slice(bytes);
        return out;
    }
    let width = uint_width_for(bytes.len() as u64);
    let mut out = vec![tags::long_bytes_tag(width)];
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes()[..width]);
    out.extend_from_slice(bytes);
    out
}

/// Smallest width in `{1, 2, 4, 8}` that can hold `n`.
fn uint_width_for(n: u64) -> usize {
    match n {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => 8,
    }
}

/// Smallest width in `{1, 2, 3, 4}` that can hold `n` (string long-form
/// length prefixes only go up to 4 bytes, unlike bytes' up to 8).
fn string_len_width(n: u64) -> usize {
    match n {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}
