//! Decoded or built BER-TLV nodes

use std::fmt;
use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};

use crate::builder::Asn1NodeBuilder;
use crate::decoder::Asn1Decoder;
use crate::error::{Asn1Error, Result};
use crate::tag;

/// One TLV node
///
/// Primitive nodes own their value bytes. Constructed nodes keep the encoded bytes of their
/// children and parse them on first access; the parsed list is kept for later calls.
#[derive(Debug, Clone)]
pub struct Asn1Node {
    tag: u32,
    content: Bytes,
    children: Option<OnceLock<Result<Vec<Self>>>>,
}

impl Asn1Node {
    /// Start building a constructed node
    pub fn builder(tag: u32) -> Result<Asn1NodeBuilder> {
        Asn1NodeBuilder::new(tag)
    }

    /// Create a primitive node
    pub fn primitive(tag: u32, value: impl Into<Bytes>) -> Result<Self> {
        if tag::is_constructed(tag) {
            return Err(Asn1Error::ConstructedLeaf(tag));
        }
        Ok(Self {
            tag,
            content: value.into(),
            children: None,
        })
    }

    /// Create a constructed node from already built children
    pub fn constructed(tag: u32, children: Vec<Self>) -> Result<Self> {
        if !tag::is_constructed(tag) {
            return Err(Asn1Error::NotConstructedTag(tag));
        }
        Ok(Self::from_children(tag, children))
    }

    pub(crate) fn from_children(tag: u32, children: Vec<Self>) -> Self {
        let mut content = BytesMut::with_capacity(children.iter().map(Self::encoded_len).sum());
        for child in &children {
            child.write_to(&mut content);
        }
        Self {
            tag,
            content: content.freeze(),
            children: Some(OnceLock::from(Ok(children))),
        }
    }

    pub(crate) fn decoded(tag: u32, content: Bytes) -> Self {
        let children = tag::is_constructed(tag).then(OnceLock::new);
        Self {
            tag,
            content,
            children,
        }
    }

    /// Tag of the node
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    /// Whether the node holds children rather than a value
    pub const fn is_constructed(&self) -> bool {
        self.children.is_some()
    }

    /// Children of the node, empty for primitive nodes
    pub fn children(&self) -> Result<&[Self]> {
        let Some(cell) = &self.children else {
            return Ok(&[]);
        };
        match cell.get_or_init(|| Asn1Decoder::new(self.content.clone()).decode_all()) {
            Ok(children) => Ok(children.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Children carrying `tag`, in encoding order
    pub fn children_with_tag(&self, tag: u32) -> Result<Vec<&Self>> {
        Ok(self.children()?.iter().filter(|c| c.tag == tag).collect())
    }

    /// First child carrying `tag`
    pub fn child(&self, tag: u32) -> Result<&Self> {
        self.children()?
            .iter()
            .find(|c| c.tag == tag)
            .ok_or(Asn1Error::TagNotFound(tag))
    }

    /// Follow a path of tags, taking the first match at each level
    pub fn child_path(&self, tags: &[u32]) -> Result<&Self> {
        tags.iter().try_fold(self, |node, tag| node.child(*tag))
    }

    /// Whether the tag path exists below this node
    pub fn has_child(&self, tags: &[u32]) -> Result<bool> {
        match self.child_path(tags) {
            Ok(_) => Ok(true),
            Err(Asn1Error::TagNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn value(&self) -> Result<&Bytes> {
        if self.is_constructed() {
            return Err(Asn1Error::ConstructedValue(self.tag));
        }
        Ok(&self.content)
    }

    /// Raw value bytes
    pub fn as_bytes(&self) -> Result<Bytes> {
        self.value().cloned()
    }

    /// Value as a signed big-endian integer of one to four bytes
    pub fn as_integer(&self) -> Result<i32> {
        let value = self.value()?;
        if value.is_empty() || value.len() > 4 {
            return Err(self.invalid(format!("{} bytes cannot hold an integer", value.len())));
        }
        let sign = if value[0] & 0x80 != 0 { -1i32 } else { 0 };
        Ok(value.iter().fold(sign, |acc, b| (acc << 8) | *b as i32))
    }

    /// Value as an unsigned big-endian number of up to eight bytes
    pub fn as_raw_long(&self) -> Result<u64> {
        let value = self.value()?;
        if value.is_empty() || value.len() > 8 {
            return Err(self.invalid(format!("{} bytes cannot hold a long", value.len())));
        }
        Ok(value.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    /// Value as a UTF-8 string
    pub fn as_string(&self) -> Result<String> {
        let value = self.value()?;
        String::from_utf8(value.to_vec()).map_err(|e| self.invalid(e.to_string()))
    }

    /// Value as a BIT STRING of up to 32 bits
    ///
    /// Bit 0 of the result is the first bit of the string, so named bit `n` maps to
    /// `1 << n`.
    pub fn as_bits(&self) -> Result<i32> {
        let value = self.value()?;
        let Some(bits) = value.get(1..) else {
            return Err(self.invalid("bit string without unused-bits byte"));
        };
        if bits.len() > 4 {
            return Err(self.invalid(format!("{} bytes exceed 32 bits", bits.len())));
        }
        let raw = bits.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        let aligned = (raw << ((4 - bits.len()) * 8)) as u32;
        Ok(aligned.reverse_bits() as i32)
    }

    /// Value as a BOOLEAN
    pub fn as_boolean(&self) -> Result<bool> {
        match self.value()?.as_ref() {
            [0x00] => Ok(false),
            [0xFF] => Ok(true),
            other => Err(self.invalid(format!("{} is not a boolean", hex::encode_upper(other)))),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> Asn1Error {
        Asn1Error::invalid_data(self.tag, reason)
    }

    /// Length of the value or of the encoded children
    pub fn data_len(&self) -> usize {
        self.content.len()
    }

    /// Length of the full TLV encoding
    pub fn encoded_len(&self) -> usize {
        tag::tag_len(self.tag) + tag::length_len(self.content.len()) + self.content.len()
    }

    /// Append the TLV encoding to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        self.write_head(buf);
        buf.extend_from_slice(&self.content);
    }

    fn write_head(&self, buf: &mut BytesMut) {
        tag::write_tag(self.tag, buf);
        tag::write_length(self.content.len(), buf);
    }

    /// TLV encoding
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// TLV encoding as upper-case hex
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.to_bytes())
    }

    /// Tag and length fields as upper-case hex
    pub fn head_hex(&self) -> String {
        let mut buf = BytesMut::with_capacity(8);
        self.write_head(&mut buf);
        hex::encode_upper(buf)
    }
}

impl PartialEq for Asn1Node {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.is_constructed() == other.is_constructed()
            && self.content == other.content
    }
}

impl Eq for Asn1Node {}

impl fmt::Display for Asn1Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn decode(data: &[u8]) -> Asn1Node {
        Asn1Decoder::new(Bytes::copy_from_slice(data)).next_node().unwrap()
    }

    #[test]
    fn test_round_trip() {
        let encoded = hex!("BF2D1EA01CE31A5A0A989209012143658709F59F70010191044E616D6592020000");
        let node = decode(&encoded);
        assert_eq!(node.to_bytes().as_ref(), encoded);
        assert_eq!(node.encoded_len(), encoded.len());
        assert_eq!(node.head_hex(), "BF2D1E");
    }

    #[test]
    fn test_child_queries() {
        let node = decode(&hex!("BF2D10A00EE30C5A0212349F7001019F7001FF"));

        let profile = node.child_path(&[0xA0, 0xE3]).unwrap();
        assert_eq!(profile.child(0x5A).unwrap().as_bytes().unwrap().as_ref(), hex!("1234"));
        assert_eq!(profile.children_with_tag(0x9F70).unwrap().len(), 2);
        assert!(profile.children_with_tag(0x91).unwrap().is_empty());
        assert_eq!(profile.child(0x9F70).unwrap().as_integer().unwrap(), 1);

        assert!(node.has_child(&[0xA0, 0xE3, 0x5A]).unwrap());
        assert!(!node.has_child(&[0xA0, 0x80]).unwrap());
        assert_eq!(node.child(0x80).unwrap_err(), Asn1Error::TagNotFound(0x80));

        let leaf = profile.child(0x5A).unwrap();
        assert!(leaf.children().unwrap().is_empty());
    }

    #[test]
    fn test_lazy_children_error() {
        // Constructed node whose content is not valid TLV
        let node = decode(&hex!("A0035A05AA"));
        let err = node.children().unwrap_err();
        assert!(matches!(err, Asn1Error::InvalidData { tag: 0x5A, .. }));
        assert_eq!(node.children().unwrap_err(), err);
    }

    #[test]
    fn test_integer() {
        assert_eq!(decode(&hex!("800100")).as_integer().unwrap(), 0);
        assert_eq!(decode(&hex!("80017F")).as_integer().unwrap(), 127);
        assert_eq!(decode(&hex!("8001FF")).as_integer().unwrap(), -1);
        assert_eq!(decode(&hex!("80020100")).as_integer().unwrap(), 256);
        assert_eq!(decode(&hex!("800480000000")).as_integer().unwrap(), i32::MIN);
        assert!(decode(&hex!("8000")).as_integer().unwrap_err().is_data_error());
        assert!(decode(&hex!("80050000000001")).as_integer().is_err());
    }

    #[test]
    fn test_raw_long_and_string() {
        assert_eq!(
            decode(&hex!("8008FFFFFFFFFFFFFFFF")).as_raw_long().unwrap(),
            u64::MAX
        );
        assert_eq!(decode(&hex!("8003414243")).as_string().unwrap(), "ABC");
        assert!(decode(&hex!("8002C328")).as_string().is_err());
    }

    #[test]
    fn test_bits() {
        // First named bit set
        assert_eq!(decode(&hex!("82020780")).as_bits().unwrap(), 1);
        assert_eq!(decode(&hex!("82020640")).as_bits().unwrap(), 2);
        assert_eq!(decode(&hex!("820105")).as_bits().unwrap(), 0);
        assert_eq!(decode(&hex!("8203060001")).as_bits().unwrap(), 1 << 15);
        assert!(decode(&hex!("8200")).as_bits().is_err());
        assert!(decode(&hex!("82060000000000")).as_bits().is_err());
    }

    #[test]
    fn test_boolean() {
        assert!(decode(&hex!("8001FF")).as_boolean().unwrap());
        assert!(!decode(&hex!("800100")).as_boolean().unwrap());
        assert!(decode(&hex!("800101")).as_boolean().is_err());
    }

    #[test]
    fn test_value_on_constructed() {
        let node = decode(&hex!("A0028000"));
        let err = node.as_bytes().unwrap_err();
        assert_eq!(err, Asn1Error::ConstructedValue(0xA0));
        assert!(err.is_misuse());
        assert!(node.as_integer().is_err());
    }
}
