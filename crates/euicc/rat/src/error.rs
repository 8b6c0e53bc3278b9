//! Error type for Rules Authorisation Table operations

use euicc_asn1::Asn1Error;

/// Errors raised while building, reading or serializing a table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatError {
    /// More rules added than the table was declared with
    #[error("Table holds {capacity} rules, cannot add more")]
    TooManyRules {
        /// Declared number of rules
        capacity: usize,
    },

    /// Table built before every declared rule was added
    #[error("Table declares {expected} rules but only {actual} were added")]
    NotEnoughRules {
        /// Declared number of rules
        expected: usize,
        /// Rules actually added
        actual: usize,
    },

    /// Rule index outside the table
    #[error("Rule index {index} out of bounds for table of {len} rules")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Table length
        len: usize,
    },

    /// Binary form could not be read back
    #[error("Malformed rules table: {0}")]
    Malformed(String),

    /// Card response could not be decoded
    #[error(transparent)]
    Asn1(#[from] Asn1Error),
}

impl RatError {
    /// Create a malformed error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed(message.into())
    }
}

/// Result type for table operations
pub type Result<T> = std::result::Result<T, RatError>;
