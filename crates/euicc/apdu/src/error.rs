//! Error type for APDU transport sessions

use crate::channel::ChannelError;
use crate::response::status::StatusWord;

/// Error delivered for a failed transport session
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Session related errors
    //
    /// Another session is already active on this transport
    #[error("Logical channel already in use by another request")]
    ChannelInUse,

    /// The channel service could not open a logical channel
    #[error("Failed to open logical channel: {0}")]
    OpenChannel(#[source] ChannelError),

    /// The channel service returned an empty open result
    #[error("Open channel response carries no channel number")]
    InvalidOpenResponse,

    //
    // Command related errors
    //
    /// A command could not be transmitted
    #[error("Transmission failed: {0}")]
    Transmit(#[source] ChannelError),

    /// The card answered with a status other than 9000 or 61XX
    #[error("Card returned status {0}")]
    Status(StatusWord),

    /// The request provider failed while building the command queue
    #[error("Request provider failed: {0}")]
    RequestProvider(String),

    /// Command data does not fit the negotiated APDU length
    #[error("Command data of {len} bytes exceeds the {max} byte limit")]
    CommandTooLong {
        /// Length of the rejected data
        len: usize,
        /// Largest data field the session accepts
        max: usize,
    },

    /// STORE DATA payload needs more blocks than P2 can number
    #[error("STORE DATA payload of {0} bytes needs more than 256 blocks")]
    StoreDataTooLong(usize),

    /// GET RESPONSE chain exceeded the configured bound
    #[error("GET RESPONSE chain exceeded {0} round trips")]
    ChainLimitExceeded(usize),
}

impl Error {
    /// Create a new status error
    pub const fn status(sw1: u8, sw2: u8) -> Self {
        Self::Status(StatusWord::new(sw1, sw2))
    }

    /// Create a request provider error with a message
    pub fn request_provider<S: Into<String>>(message: S) -> Self {
        Self::RequestProvider(message.into())
    }

    /// Get the status word if this is a status error
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status(sw) => Some(*sw),
            _ => None,
        }
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;
