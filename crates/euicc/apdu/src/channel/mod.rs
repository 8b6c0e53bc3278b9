//! Card channel abstraction
//!
//! A [`CardChannelService`] is the collaborator that actually reaches the card. It opens a
//! logical channel with an application selected, exchanges single APDUs on it and closes
//! it again. The [`ApduTransport`](crate::ApduTransport) drives one of these for every
//! session.

pub mod error;
#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
pub use error::ChannelError;

use crate::command::ApduCommand;
use crate::response::ApduResponse;

/// Access to logical channels on a card
///
/// Implementations do not interpret status words: a `61XX` or `6985` response is a
/// successful transmission and is returned as such.
#[async_trait]
pub trait CardChannelService: Send + Sync + fmt::Debug {
    /// Open a logical channel and select `aid` on it
    ///
    /// The returned bytes start with the channel number, followed by the response to the
    /// SELECT command.
    async fn open_logical_channel(&self, aid: &[u8]) -> Result<Bytes, ChannelError>;

    /// Transmit one command on an open channel
    async fn transmit(
        &self,
        channel: u8,
        command: &ApduCommand,
    ) -> Result<ApduResponse, ChannelError>;

    /// Close a channel previously returned by [`open_logical_channel`](Self::open_logical_channel)
    async fn close_logical_channel(&self, channel: u8) -> Result<(), ChannelError>;
}

#[async_trait]
impl<T: CardChannelService + ?Sized> CardChannelService for Arc<T> {
    async fn open_logical_channel(&self, aid: &[u8]) -> Result<Bytes, ChannelError> {
        (**self).open_logical_channel(aid).await
    }

    async fn transmit(
        &self,
        channel: u8,
        command: &ApduCommand,
    ) -> Result<ApduResponse, ChannelError> {
        (**self).transmit(channel, command).await
    }

    async fn close_logical_channel(&self, channel: u8) -> Result<(), ChannelError> {
        (**self).close_logical_channel(channel).await
    }
}
