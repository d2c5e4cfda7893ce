//! TLV8 codec: the tag-length-value framing HomeKit-derived pairing
//! handshakes use to carry `Pair-Setup`/`Pair-Verify` messages.
//!
//! A record is a sequence of `(tag: u8, length: u8, value: [u8; length])`
//! triples. Values longer than 255 bytes are split into consecutive
//! 255-byte chunks sharing the same tag; the reader concatenates
//! consecutive same-tag triples back into one logical value.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::fmt;

use thiserror::Error;

/// Maximum bytes a single TLV chunk can carry.
const CHUNK_SIZE: usize = 255;

/// Errors produced while parsing a TLV8 byte stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TlvError {
    /// Fewer than 2 bytes remained where a tag+length pair was expected.
    #[error("truncated tlv: expected a tag/length pair, found {remaining} byte(s)")]
    TruncatedHeader {
        /// Bytes actually remaining in the input.
        remaining: usize,
    },

    /// The length byte claimed more value bytes than remained in the input.
    #[error("truncated tlv: tag {tag:#04x} claims {claimed} byte(s), only {remaining} remain")]
    TruncatedValue {
        /// Tag of the truncated entry.
        tag: u8,
        /// Bytes the length field claimed.
        claimed: usize,
        /// Bytes actually available.
        remaining: usize,
    },

    /// A required tag was absent from a decoded record.
    #[error("missing required tag {0:#04x}")]
    MissingTag(u8),
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, TlvError>;

/// An ordered multimap of TLV entries, one logical value per tag.
///
/// Iteration order matches the order tags were first seen on the wire.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlvMap {
    entries: Vec<(u8, Vec<u8>)>,
}

impl TlvMap {
    /// Decode a TLV8 byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::TruncatedHeader`] or [`TlvError::TruncatedValue`]
    /// if a tag/length pair or its value is cut short.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut entries: Vec<(u8, Vec<u8>)> = Vec::new();
        let mut i = 0usize;

        while i < bytes.len() {
            let remaining = bytes.len() - i;
            if remaining < 2 {
                return Err(TlvError::TruncatedHeader { remaining });
            }

            let tag = bytes[i];
            let len = bytes[i + 1] as usize;
            let value_start = i + 2;
            let remaining_after_header = bytes.len() - value_start;

            if remaining_after_header < len {
                return Err(TlvError::TruncatedValue {
                    tag,
                    claimed: len,
                    remaining: remaining_after_header,
                });
            }

            let value = &bytes[value_start..value_start + len];

            match entries.last_mut() {
                Some((last_tag, last_value)) if *last_tag == tag => {
                    last_value.extend_from_slice(value);
                }
                _ => entries.push((tag, value.to_vec())),
            }

            i = value_start + len;
        }

        Ok(Self { entries })
    }

    /// Look up the logical value for a tag, if present.
    #[must_use]
    pub fn get(&self, tag: u8) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_slice())
    }

    /// Look up a required tag, failing with [`TlvError::MissingTag`].
    ///
    /// # Errors
    ///
    /// Returns [`TlvError::MissingTag`] if `tag` is absent.
    pub fn require(&self, tag: u8) -> Result<&[u8]> {
        self.get(tag).ok_or(TlvError::MissingTag(tag))
    }

    /// Iterate entries in tag-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.entries.iter().map(|(t, v)| (*t, v.as_slice()))
    }

    /// Number of distinct tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TlvMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(t, v)| (t, v)))
            .finish()
    }
}

/// Builds a TLV8 byte stream from an ordered sequence of tag/value pairs.
///
/// Each `add` call emits one logical value, chunked into ≤255-byte pieces
/// sharing `tag`. An empty value still emits exactly one `(tag, 0)` triple.
#[derive(Debug, Default, Clone)]
pub struct TlvWriter {
    out: Vec<u8>,
}

impl TlvWriter {
    /// Start a new, empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag/value pair, chunking as needed.
    #[must_use]
    pub fn add(mut self, tag: u8, value: &[u8]) -> Self {
        if value.is_empty() {
            self.out.push(tag);
            self.out.push(0);
            return self;
        }

        for chunk in value.chunks(CHUNK_SIZE) {
            self.out.push(tag);
            #[allow(clippy::cast_possible_truncation)]
            self.out.push(chunk.len() as u8);
            self.out.extend_from_slice(chunk);
        }

        // A value whose length is an exact multiple of 255 must still
        // terminate with a trailing (possibly zero-length) chunk so the
        // reader knows the logical value ended here.
        if value.len().is_multiple_of(CHUNK_SIZE) {
            self.out.push(tag);
            self.out.push(0);
        }

        self
    }

    /// Append a single-byte value.
    #[must_use]
    pub fn add_byte(self, tag: u8, value: u8) -> Self {
        self.add(tag, &[value])
    }

    /// Consume the writer, returning the encoded bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.out
    }
}
