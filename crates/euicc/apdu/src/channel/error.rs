//! Error types reported by a card channel service

use thiserror::Error;

use crate::response::status::StatusWord;

/// Failure reported by a [`CardChannelService`](super::CardChannelService)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Connection error
    #[error("Failed to connect to card")]
    Connection,

    /// The card has no free logical channel
    #[error("No logical channel available")]
    NoChannelAvailable,

    /// The application could not be selected on the new channel
    #[error("SELECT by AID failed with status {0}")]
    SelectFailed(StatusWord),

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Response too short to carry a status word
    #[error("Incomplete response: {0} bytes")]
    IncompleteResponse(usize),

    /// Error raised by the underlying reader driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl ChannelError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Create a driver error
    pub fn driver<S: Into<String>>(message: S) -> Self {
        Self::Driver(message.into())
    }
}
