//! BER-TLV codec for eUICC data structures
//!
//! Decodes and builds the definite-length subset of X.690 BER used by GSMA SGP.22
//! commands. Tags are handled as the big-endian concatenation of their raw bytes, so
//! `0xBF3E` is the two byte tag `BF 3E`.
//!
//! Constructed nodes decoded from a buffer parse their children only when first queried.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod decoder;
pub mod node;
pub mod tag;

mod error;

pub use builder::Asn1NodeBuilder;
pub use decoder::Asn1Decoder;
pub use error::{Asn1Error, Result};
pub use node::Asn1Node;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{Asn1Decoder, Asn1Error, Asn1Node, Asn1NodeBuilder, Result};
}
