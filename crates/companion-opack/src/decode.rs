//! OPACK decoding: parses a byte stream into a [`Value`] tree, resolving
//! back-references against a table built up as decoding proceeds.

use crate::{
    OpackError, Result, Value,
    tags::{self, Tag},
};

pub(crate) struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Decoded values eligible for future back-references, in the order
    /// they were first seen. Composite values and one-byte primitives are
    /// never pushed here (mirrors the encoder's table).
    table: Vec<Value>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            table: Vec::new(),
        }
    }

    pub(crate) fn decode(&mut self) -> Result<Value> {
        let start = self.pos;
        let byte = self.next_byte()?;

        let value = match tags::classify(byte) {
            Tag::True => Value::Bool(true),
            Tag::False => Value::Bool(false),
            Tag::Null => Value::Null,
            Tag::SmallInt(n) => Value::Int(i64::from(n)),
            Tag::SizedUint { width } => {
                let value = self.read_uint_le(width)?;
                Value::UInt { width, value }
            }
            Tag::F32 => {
                let bytes = self.read_bytes(4)?;
                let arr: [u8; 4] = bytes.try_into().unwrap_or([0; 4]);
                Value::F32(f32::from_le_bytes(arr))
            }
            Tag::F64 => {
                let bytes = self.read_bytes(8)?;
                let arr: [u8; 8] = bytes.try_into().unwrap_or([0; 8]);
                Value::F64(f64::from_le_bytes(arr))
            }
            Tag::Uuid => {
                let bytes = self.read_bytes(16)?;
                let arr: [u8; 16] = bytes.try_into().unwrap_or([0; 16]);
                Value::Uuid(arr)
            }
            Tag::AbsoluteTime => {
                let value = self.read_uint_le(8)?;
                Value::AbsoluteTime(value)
            }
            Tag::ShortString { len } => {
                let bytes = self.read_bytes(len)?;
                Value::Str(str_from_utf8(bytes)?)
            }
            Tag::LongString { len_width } => {
                let len = self.read_uint_le(len_width)? as usize;
                let bytes = self.read_bytes(len)?;
                Value::Str(str_from_utf8(bytes)?)
            }
            Tag::ShortBytes { len } => {
                let bytes = self.read_bytes(len)?;
                Value::Bytes(bytes.to_vec())
            }
            Tag::LongBytes { len_width } => {
                let len = self.read_uint_le(len_width)? as usize;
                let bytes = self.read_bytes(len)?;
                Value::Bytes(bytes.to_vec())
            }
            Tag::Array { count } => {
                let items = (0..count)
                    .map(|_| self.decode())
                    .collect::<Result<Vec<_>>>()?;
                return Ok(Value::Array(items));
            }
            Tag::EndlessArray => {
                let items = self.decode_until_terminator()?;
                return Ok(Value::Array(items));
            }
            Tag::Map { count } => {
                let entries = (0..count)
                    .map(|_| self.decode_map_entry())
                    .collect::<Result<_>>()?;
                return Ok(Value::Map(entries));
            }
            Tag::EndlessMap => {
                let mut entries = Vec::new();
                while !self.peek_is_terminator()? {
                    entries.push(self.decode_map_entry()?);
                }
                self.next_byte()?; // consume terminator
                return Ok(Value::Map(entries));
            }
            Tag::BackRef { index } => return self.resolve_back_ref(index),
            Tag::LongBackRef { index_width } => {
                let index = self.read_uint_le(index_width)? as usize;
                return self.resolve_back_ref(index);
            }
            Tag::Terminator | Tag::Unsupported => return Err(OpackError::UnsupportedTag(byte)),
        };

        let encoded_len = self.pos - start;
        if encoded_len > 1 {
            self.table.push(value.clone());
        }
        Ok(value)
    }

    fn decode_map_entry(&mut self) -> Result<(String, Value)> {
        let key = self.decode()?;
        let Value::Str(key) = key else {
            return Err(OpackError::NonStringMapKey);
        };
        let value = self.decode()?;
        Ok((key, value))
    }

    fn decode_until_terminator(&mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        while !self.peek_is_terminator()? {
            items.push(self.decode()?);
        }
        self.next_byte()?; // consume terminator
        Ok(items)
    }

    fn peek_is_terminator(&self) -> Result<bool> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(OpackError::MissingTerminator)?;
        Ok(byte == tags::TERMINATOR)
    }

    fn resolve_back_ref(&self, index: usize) -> Result<Value> {
        self.table
            .get(index)
            .cloned()
            .ok_or(OpackError::UndefinedBackReference(index))
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self.bytes.get(self.pos).ok_or(OpackError::Eof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(OpackError::Eof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(OpackError::Eof)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_uint_le(&mut self, width: usize) -> Result<u64> {
        let bytes = self.read_bytes(width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }
}

fn str_from_utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| OpackError::InvalidUtf8)
}
