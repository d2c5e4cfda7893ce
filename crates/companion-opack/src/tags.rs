//! Tag-byte constants and classification for the OPACK wire format.

/// The leading byte of an OPACK value, classified into the form it
/// introduces. Produced by [`classify`] and consumed by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tag {
    True,
    False,
    /// Terminator for an "endless" array/map; never a value in its own right.
    Terminator,
    Null,
    Uuid,
    AbsoluteTime,
    SmallInt(u8),
    SizedUint {
        width: usize,
    },
    F32,
    F64,
    ShortString {
        len: usize,
    },
    LongString {
        len_width: usize,
    },
    ShortBytes {
        len: usize,
    },
    LongBytes {
        len_width: usize,
    },
    Array {
        count: usize,
    },
    EndlessArray,
    Map {
        count: usize,
    },
    EndlessMap,
    BackRef {
        index: usize,
    },
    LongBackRef {
        index_width: usize,
    },
    Unsupported,
}

pub(crate) const TRUE: u8 = 0x01;
pub(crate) const FALSE: u8 = 0x02;
pub(crate) const TERMINATOR: u8 = 0x03;
pub(crate) const NULL: u8 = 0x04;
pub(crate) const UUID: u8 = 0x05;
pub(crate) const ABSOLUTE_TIME: u8 = 0x06;
pub(crate) const SMALL_INT_START: u8 = 0x08;
pub(crate) const SMALL_INT_END: u8 = 0x2F;
pub(crate) const SIZED_UINT_START: u8 = 0x30;
pub(crate) const SIZED_UINT_END: u8 = 0x33;
pub(crate) const F32_TAG: u8 = 0x35;
pub(crate) const F64_TAG: u8 = 0x36;
pub(crate) const SHORT_STRING_START: u8 = 0x40;
pub(crate) const SHORT_STRING_END: u8 = 0x60;
pub(crate) const LONG_STRING_START: u8 = 0x61;
pub(crate) const LONG_STRING_END: u8 = 0x64;
pub(crate) const SHORT_BYTES_START: u8 = 0x70;
pub(crate) const SHORT_BYTES_END: u8 = 0x90;
pub(crate) const LONG_BYTES_START: u8 = 0x91;
pub(crate) const LONG_BYTES_END: u8 = 0x94;
pub(crate) const BACKREF_START: u8 = 0xA0;
pub(crate) const BACKREF_END: u8 = 0xC0;
pub(crate) const LONG_BACKREF_START: u8 = 0xC1;
pub(crate) const LONG_BACKREF_END: u8 = 0xC4;
pub(crate) const ARRAY_START: u8 = 0xD0;
pub(crate) const ARRAY_END: u8 = 0xDE;
pub(crate) const ENDLESS_ARRAY: u8 = 0xDF;
pub(crate) const MAP_START: u8 = 0xE0;
pub(crate) const MAP_END: u8 = 0xEE;
pub(crate) const ENDLESS_MAP: u8 = 0xEF;

/// Maximum index a short back-reference tag can carry (`0x21` per spec).
pub(crate) const SHORT_BACKREF_LIMIT: usize = 0x21;

/// Classify a leading byte into the value form it introduces.
pub(crate) fn classify(byte: u8) -> Tag {
    match byte {
        TRUE => Tag::True,
        FALSE => Tag::False,
        TERMINATOR => Tag::Terminator,
        NULL => Tag::Null,
        UUID => Tag::Uuid,
        ABSOLUTE_TIME => Tag::AbsoluteTime,
        SMALL_INT_START..=SMALL_INT_END => Tag::SmallInt(byte - SMALL_INT_START),
        SIZED_UINT_START..=SIZED_UINT_END => Tag::SizedUint {
            width: sized_uint_width(byte - SIZED_UINT_START),
        },
        F32_TAG => Tag::F32,
        F64_TAG => Tag::F64,
        SHORT_STRING_START..=SHORT_STRING_END => Tag::ShortString {
            len: (byte - SHORT_STRING_START) as usize,
        },
        LONG_STRING_START..=LONG_STRING_END => Tag::LongString {
            len_width: (byte - LONG_STRING_START + 1) as usize,
        },
        SHORT_BYTES_START..=SHORT_BYTES_END => Tag::ShortBytes {
            len: (byte - SHORT_BYTES_START) as usize,
        },
        LONG_BYTES_START..=LONG_BYTES_END => Tag::LongBytes {
            len_width: long_bytes_len_width(byte - LONG_BYTES_START),
        },
        BACKREF_START..=BACKREF_END => Tag::BackRef {
            index: (byte - BACKREF_START) as usize,
        },
        LONG_BACKREF_START..=LONG_BACKREF_END => Tag::LongBackRef {
            index_width: (byte - LONG_BACKREF_START + 1) as usize,
        },
        ARRAY_START..=ARRAY_END => Tag::Array {
            count: (byte - ARRAY_START) as usize,
        },
        ENDLESS_ARRAY => Tag::EndlessArray,
        MAP_START..=MAP_END => Tag::Map {
            count: (byte - MAP_START) as usize,
        },
        ENDLESS_MAP => Tag::EndlessMap,
        _ => Tag::Unsupported,
    }
}

/// Widths for the sized-uint tags `0x30..=0x33`: 1, 2, 4, 8 bytes.
fn sized_uint_width(offset: u8) -> usize {
    match offset {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

/// Widths for the long-bytes length-prefix tags `0x91..=0x94`: 1, 2, 4, 8.
fn long_bytes_len_width(offset: u8) -> usize {
    match offset {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

/// Encode-side: pick the sized-uint tag byte for a given byte width.
pub(crate) fn sized_uint_tag(width: usize) -> u8 {
    match width {
        1 => SIZED_UINT_START,
        2 => SIZED_UINT_START + 1,
        4 => SIZED_UINT_START + 2,
        _ => SIZED_UINT_START + 3,
    }
}

/// Encode-side: pick the long-bytes tag byte for a given length-prefix width.
pub(crate) fn long_bytes_tag(width: usize) -> u8 {
    match width {
        1 => LONG_BYTES_START,
        2 => LONG_BYTES_START + 1,
        4 => LONG_BYTES_START + 2,
        _ => LONG_BYTES_START + 3,
    }
}

/// Encode-side: pick the long-string tag byte for a given length-prefix width
/// (`1..=4`, unlike long-bytes' `1/2/4/8`).
pub(crate) fn long_string_tag(width: usize) -> u8 {
    LONG_STRING_START + (width as u8 - 1)
}
