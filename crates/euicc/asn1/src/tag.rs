//! Tag and length field helpers
//!
//! A tag is stored as the big-endian concatenation of its raw bytes, so `0xBF3E` is the
//! two byte tag `BF 3E`.

use bytes::{BufMut, BytesMut};

/// Longest tag the codec accepts, in bytes
pub const MAX_TAG_LEN: usize = 4;

/// Longest long-form length field the codec accepts, in bytes
pub const MAX_LENGTH_BYTES: usize = 4;

/// Number of bytes the tag occupies on the wire
pub const fn tag_len(tag: u32) -> usize {
    let significant = 32 - tag.leading_zeros() as usize;
    if significant == 0 {
        1
    } else {
        significant.div_ceil(8)
    }
}

/// Whether the tag has the constructed bit set in its first byte
pub const fn is_constructed(tag: u32) -> bool {
    let first = (tag >> ((tag_len(tag) - 1) * 8)) as u8;
    first & 0x20 != 0
}

pub(crate) const fn length_len(length: usize) -> usize {
    if length < 0x80 {
        1
    } else if length <= 0xFF {
        2
    } else if length <= 0xFFFF {
        3
    } else if length <= 0xFF_FFFF {
        4
    } else {
        5
    }
}

pub(crate) fn write_tag(tag: u32, buf: &mut BytesMut) {
    let len = tag_len(tag);
    buf.put_slice(&tag.to_be_bytes()[4 - len..]);
}

pub(crate) fn write_length(length: usize, buf: &mut BytesMut) {
    let count = length_len(length) - 1;
    if count == 0 {
        buf.put_u8(length as u8);
    } else {
        buf.put_u8(0x80 | count as u8);
        buf.put_slice(&(length as u32).to_be_bytes()[4 - count..]);
    }
}
