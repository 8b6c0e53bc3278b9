//! APDU response definitions
//!
//! This module provides the response type returned by a
//! [`CardChannelService`](crate::CardChannelService) for each transmitted command.

pub mod status;

use bytes::Bytes;
use tracing::trace;

use crate::channel::ChannelError;
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response payload data
    data: Bytes,
    /// Status word
    status: StatusWord,
}

impl ApduResponse {
    /// Create a new response with payload and status
    pub fn new(data: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            status: status.into(),
        }
    }

    /// Create a success response
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self::new(data, StatusWord::SUCCESS)
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(raw: &Bytes) -> Result<Self, ChannelError> {
        if raw.len() < 2 {
            return Err(ChannelError::IncompleteResponse(raw.len()));
        }

        let split = raw.len() - 2;
        let status = StatusWord::new(raw[split], raw[split + 1]);
        let data = raw.slice(..split);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = data.len(),
            "Parsed APDU response"
        );

        Ok(Self { data, status })
    }

    /// Response payload data
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// SW1 byte
    pub const fn sw1(&self) -> u8 {
        self.status.sw1
    }

    /// SW2 byte
    pub const fn sw2(&self) -> u8 {
        self.status.sw2
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Split into payload and status word
    pub fn into_parts(self) -> (Bytes, StatusWord) {
        (self.data, self.status)
    }
}
