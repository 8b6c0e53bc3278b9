//! Transport configuration

/// Tuning knobs for an [`ApduTransport`](crate::ApduTransport)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportConfig {
    /// Upper bound on GET RESPONSE round trips for a single command
    ///
    /// `None` follows the card for as long as it keeps answering `61XX`.
    pub max_get_response_chain: Option<usize>,
}

impl TransportConfig {
    /// Create a configuration with no chain bound
    pub const fn new() -> Self {
        Self {
            max_get_response_chain: None,
        }
    }

    /// Set the GET RESPONSE chain bound
    pub const fn with_max_get_response_chain(mut self, max: usize) -> Self {
        self.max_get_response_chain = Some(max);
        self
    }
}
