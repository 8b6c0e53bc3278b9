//! Streaming BER-TLV decoder

use bytes::Bytes;
use tracing::trace;

use crate::error::{Asn1Error, Result};
use crate::node::Asn1Node;
use crate::tag::{MAX_LENGTH_BYTES, MAX_TAG_LEN};

/// Reads consecutive top-level TLVs from a buffer
#[derive(Debug, Clone)]
pub struct Asn1Decoder {
    buf: Bytes,
    position: usize,
    end: usize,
}

impl Asn1Decoder {
    /// Decode the whole of `buf`
    pub fn new(buf: impl Into<Bytes>) -> Self {
        let buf = buf.into();
        let end = buf.len();
        Self {
            buf,
            position: 0,
            end,
        }
    }

    /// Decode `len` bytes of `buf` starting at `offset`
    pub fn with_range(buf: impl Into<Bytes>, offset: usize, len: usize) -> Result<Self> {
        let buf = buf.into();
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or(Asn1Error::OutOfBounds {
                offset,
                len,
                available: buf.len(),
            })?;
        Ok(Self {
            buf,
            position: offset,
            end,
        })
    }

    /// Decode a hex string
    pub fn from_hex(hex: &str) -> Result<Self> {
        let buf = hex::decode(hex).map_err(|e| Asn1Error::invalid_data(0, e.to_string()))?;
        Ok(Self::new(buf))
    }

    /// Current cursor position in the buffer
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Whether any bytes remain to be decoded
    pub const fn has_next_node(&self) -> bool {
        self.position < self.end
    }

    /// Decode the next top-level TLV
    ///
    /// On failure the cursor is left at the point where decoding stopped.
    pub fn next_node(&mut self) -> Result<Asn1Node> {
        let mut pos = self.position;
        let result = read_node(&self.buf, self.end, &mut pos);
        self.position = pos;

        if let Ok(node) = &result {
            trace!(tag = format_args!("{:#X}", node.tag()), len = node.data_len(), "Decoded TLV");
        }
        result
    }

    /// Decode every remaining top-level TLV
    pub fn decode_all(&mut self) -> Result<Vec<Asn1Node>> {
        let mut nodes = Vec::new();
        while self.has_next_node() {
            nodes.push(self.next_node()?);
        }
        Ok(nodes)
    }
}

fn read_node(buf: &Bytes, end: usize, pos: &mut usize) -> Result<Asn1Node> {
    let tag = read_tag(buf, end, pos)?;
    let length = read_length(buf, end, pos, tag)?;

    let remaining = end - *pos;
    if length > remaining {
        return Err(Asn1Error::invalid_data(
            tag,
            format!("length {length} at position {pos} exceeds remaining {remaining} bytes"),
        ));
    }

    let content = buf.slice(*pos..*pos + length);
    *pos += length;
    Ok(Asn1Node::decoded(tag, content))
}

fn read_tag(buf: &[u8], end: usize, pos: &mut usize) -> Result<u32> {
    if *pos >= end {
        return Err(Asn1Error::invalid_data(0, "no data left for a tag"));
    }
    let first = buf[*pos];
    *pos += 1;
    let mut tag = first as u32;

    if first & 0x1F == 0x1F {
        let mut len = 1;
        loop {
            if *pos >= end {
                return Err(Asn1Error::invalid_data(0, "truncated tag"));
            }
            if len == MAX_TAG_LEN {
                return Err(Asn1Error::invalid_data(
                    0,
                    format!("tag longer than {MAX_TAG_LEN} bytes"),
                ));
            }
            let byte = buf[*pos];
            *pos += 1;
            len += 1;
            tag = (tag << 8) | byte as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
    }

    Ok(tag)
}

fn read_length(buf: &[u8], end: usize, pos: &mut usize, tag: u32) -> Result<usize> {
    if *pos >= end {
        return Err(Asn1Error::invalid_data(tag, "missing length"));
    }
    let first = buf[*pos];
    *pos += 1;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }

    let count = (first & 0x7F) as usize;
    if count == 0 {
        return Err(Asn1Error::invalid_data(tag, "indefinite length is not supported"));
    }
    if count > MAX_LENGTH_BYTES {
        return Err(Asn1Error::invalid_data(
            tag,
            format!("length field of {count} bytes is too long"),
        ));
    }
    if count > end - *pos {
        return Err(Asn1Error::invalid_data(tag, "truncated length"));
    }

    let length = buf[*pos..*pos + count]
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
    *pos += count;
    Ok(length)
}
