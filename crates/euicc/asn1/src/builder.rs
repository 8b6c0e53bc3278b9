//! Builder for constructed nodes

use bytes::Bytes;

use crate::decoder::Asn1Decoder;
use crate::error::{Asn1Error, Result};
use crate::node::Asn1Node;
use crate::tag;

/// Collects children for a constructed node
///
/// Children keep the order they were added in and tags may repeat.
#[derive(Debug, Clone)]
pub struct Asn1NodeBuilder {
    tag: u32,
    children: Vec<Asn1Node>,
}

impl Asn1NodeBuilder {
    /// Create a builder for a constructed `tag`
    pub fn new(tag: u32) -> Result<Self> {
        if !tag::is_constructed(tag) {
            return Err(Asn1Error::NotConstructedTag(tag));
        }
        Ok(Self {
            tag,
            children: Vec::new(),
        })
    }

    /// Append a node
    pub fn add_child(&mut self, child: Asn1Node) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Append the node `builder` currently describes
    pub fn add_child_builder(&mut self, builder: &Self) -> &mut Self {
        self.add_child(builder.build())
    }

    /// Append every TLV found in `encoded`, verbatim
    pub fn add_children(&mut self, encoded: &[u8]) -> Result<&mut Self> {
        let nodes = Asn1Decoder::new(Bytes::copy_from_slice(encoded)).decode_all()?;
        self.children.extend(nodes);
        Ok(self)
    }

    fn add_leaf(&mut self, tag: u32, value: impl Into<Bytes>) -> Result<&mut Self> {
        let child = Asn1Node::primitive(tag, value)?;
        Ok(self.add_child(child))
    }

    /// Append an integer in its shortest two's complement form
    pub fn add_child_as_integer(&mut self, tag: u32, value: i32) -> Result<&mut Self> {
        self.add_leaf(tag, encode_integer(value))
    }

    /// Append a UTF-8 string
    pub fn add_child_as_string(&mut self, tag: u32, value: &str) -> Result<&mut Self> {
        self.add_leaf(tag, Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Append raw bytes
    pub fn add_child_as_bytes(&mut self, tag: u32, value: impl Into<Bytes>) -> Result<&mut Self> {
        self.add_leaf(tag, value)
    }

    /// Append bytes given as a hex string
    pub fn add_child_as_bytes_from_hex(&mut self, tag: u32, value: &str) -> Result<&mut Self> {
        if tag::is_constructed(tag) {
            return Err(Asn1Error::ConstructedLeaf(tag));
        }
        let bytes = hex::decode(value).map_err(|e| Asn1Error::invalid_data(tag, e.to_string()))?;
        self.add_leaf(tag, bytes)
    }

    /// Append a BIT STRING where bit `n` of `value` is named bit `n`
    pub fn add_child_as_bits(&mut self, tag: u32, value: i32) -> Result<&mut Self> {
        self.add_leaf(tag, encode_bits(value))
    }

    /// Append a BOOLEAN
    pub fn add_child_as_boolean(&mut self, tag: u32, value: bool) -> Result<&mut Self> {
        self.add_leaf(tag, vec![if value { 0xFF } else { 0x00 }])
    }

    /// Produce the node; the builder stays usable
    pub fn build(&self) -> Asn1Node {
        Asn1Node::from_children(self.tag, self.children.clone())
    }
}

fn encode_integer(value: i32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // Drop leading bytes that only repeat the sign of the next one
    while start < 3 {
        let (lead, next) = (bytes[start], bytes[start + 1]);
        if (lead == 0x00 && next & 0x80 == 0) || (lead == 0xFF && next & 0x80 != 0) {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

fn encode_bits(value: i32) -> Vec<u8> {
    let reversed = (value as u32).reverse_bits().to_be_bytes();
    let used = reversed.iter().rposition(|b| *b != 0).map_or(0, |last| last + 1);
    let unused = if used == 0 {
        0
    } else {
        reversed[used - 1].trailing_zeros() as u8
    };

    let mut encoded = Vec::with_capacity(used + 1);
    encoded.push(unused);
    encoded.extend_from_slice(&reversed[..used]);
    encoded
}
