//! Error type for BER-TLV decoding and building

/// Errors raised by the codec
///
/// [`InvalidData`](Self::InvalidData) and [`TagNotFound`](Self::TagNotFound) describe bytes
/// that do not have the expected shape. The remaining variants signal a call that the node
/// or builder cannot honour.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Asn1Error {
    /// Bytes are not valid BER-TLV or do not fit the requested interpretation
    #[error("Invalid data for tag {tag:#04X}: {reason}")]
    InvalidData {
        /// Tag being decoded, 0 when the tag itself could not be read
        tag: u32,
        /// What went wrong
        reason: String,
    },

    /// No child with the requested tag
    #[error("Tag {0:#04X} not found")]
    TagNotFound(u32),

    /// A value accessor was called on a constructed node
    #[error("Constructed node {0:#04X} has no value")]
    ConstructedValue(u32),

    /// A leaf value was added with a constructed tag
    #[error("Cannot add a value with constructed tag {0:#04X}")]
    ConstructedLeaf(u32),

    /// A builder was requested for a primitive tag
    #[error("Tag {0:#04X} is not a constructed tag")]
    NotConstructedTag(u32),

    /// Decoder range lies outside the buffer
    #[error("Range {offset}..{offset}+{len} is outside a buffer of {available} bytes")]
    OutOfBounds {
        /// Start of the requested range
        offset: usize,
        /// Length of the requested range
        len: usize,
        /// Length of the buffer
        available: usize,
    },
}

impl Asn1Error {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(tag: u32, reason: S) -> Self {
        Self::InvalidData {
            tag,
            reason: reason.into(),
        }
    }

    /// Whether the error describes malformed or unexpected card data
    pub const fn is_data_error(&self) -> bool {
        matches!(self, Self::InvalidData { .. } | Self::TagNotFound(_))
    }

    /// Whether the error describes a call the node or builder cannot honour
    pub const fn is_misuse(&self) -> bool {
        !self.is_data_error()
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Asn1Error>;
