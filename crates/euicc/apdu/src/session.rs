//! A single open → build → execute → close run on one logical channel

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use derive_more::Display;
use tracing::{debug, trace, warn};

use crate::channel::CardChannelService;
use crate::command::ApduCommand;
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::request::RequestBuilder;
use crate::response::ApduResponse;

/// A logical channel opened for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalChannel {
    number: u8,
    aid: Bytes,
    select_response: Bytes,
}

impl LogicalChannel {
    /// Interpret the raw result of
    /// [`open_logical_channel`](crate::CardChannelService::open_logical_channel)
    ///
    /// The first byte is the channel number, everything after it is the select response.
    pub fn from_open_response(aid: &[u8], raw: Bytes) -> Result<Self> {
        let Some(&number) = raw.first() else {
            return Err(Error::InvalidOpenResponse);
        };
        Ok(Self {
            number,
            aid: Bytes::copy_from_slice(aid),
            select_response: raw.slice(1..),
        })
    }

    /// Channel number
    pub const fn number(&self) -> u8 {
        self.number
    }

    /// Application selected on the channel
    pub const fn aid(&self) -> &Bytes {
        &self.aid
    }

    /// Response to the SELECT command issued while opening
    pub const fn select_response(&self) -> &Bytes {
        &self.select_response
    }
}

/// Where a session currently is in its lifecycle
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Request provider is filling the command queue
    #[display("building")]
    Building,
    /// Command `index` has been transmitted
    #[display("executing({index})")]
    Executing {
        /// Position in the command queue
        index: usize,
    },
    /// Fetching the remaining response of command `index`
    #[display("get-response({index}, {chain})")]
    GetResponse {
        /// Position in the command queue
        index: usize,
        /// GET RESPONSE round trips issued so far for this command
        chain: usize,
    },
    /// Channel is being closed
    #[display("closing")]
    Closing,
    /// Terminal state
    #[display("closed")]
    Closed,
}

/// Owns the channel, queue and response buffer of one transport run
#[derive(Debug)]
pub(crate) struct Session<'a, S: ?Sized> {
    service: &'a S,
    channel: LogicalChannel,
    config: TransportConfig,
    queue: VecDeque<ApduCommand>,
    buffer: BytesMut,
    state: SessionState,
}

impl<'a, S> Session<'a, S>
where
    S: CardChannelService + ?Sized,
{
    pub(crate) fn new(service: &'a S, channel: LogicalChannel, config: TransportConfig) -> Self {
        Self {
            service,
            channel,
            config,
            queue: VecDeque::new(),
            buffer: BytesMut::new(),
            state: SessionState::Building,
        }
    }

    fn transition(&mut self, next: SessionState) {
        trace!(from = %self.state, to = %next, channel = self.channel.number, "Session state");
        self.state = next;
    }

    /// Fill the queue from the request provider, then execute it
    ///
    /// Returns the data of the last executed command, or `None` for an empty queue.
    pub(crate) async fn run<P, F>(
        &mut self,
        extended: bool,
        provider: P,
        should_continue: F,
    ) -> Result<Option<Bytes>>
    where
        P: FnOnce(&[u8], &mut RequestBuilder) -> Result<()>,
        F: FnMut(&[u8]) -> bool,
    {
        let mut builder = RequestBuilder::new(self.channel.number, extended);
        provider(&self.channel.select_response[..], &mut builder)?;
        self.queue.extend(builder.into_commands());
        debug!(commands = self.queue.len(), "Request built");

        self.execute(should_continue).await
    }

    async fn execute<F>(&mut self, mut should_continue: F) -> Result<Option<Bytes>>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut index = 0;
        let mut last = None;
        while let Some(command) = self.queue.pop_front() {
            self.transition(SessionState::Executing { index });
            let result = self.execute_command(index, &command).await?;

            if !self.queue.is_empty() && !should_continue(&result[..]) {
                debug!(index, skipped = self.queue.len(), "Stopping on intermediate result");
                self.queue.clear();
            }
            last = Some(result);
            index += 1;
        }
        Ok(last)
    }

    /// Transmit one command and follow its `61XX` chain to completion
    async fn execute_command(&mut self, index: usize, command: &ApduCommand) -> Result<Bytes> {
        self.buffer.clear();
        let mut response = self.transmit(command).await?;
        let mut chain = 0;

        loop {
            let (data, status) = response.into_parts();
            self.buffer.extend_from_slice(&data);

            if status.is_success() {
                return Ok(self.buffer.split().freeze());
            }

            let Some(remaining) = status.remaining_bytes() else {
                debug!(index, status = %status, "{}", status.description());
                return Err(Error::Status(status));
            };

            chain += 1;
            if let Some(max) = self.config.max_get_response_chain {
                if chain > max {
                    warn!(index, max, "GET RESPONSE chain limit exceeded");
                    return Err(Error::ChainLimitExceeded(max));
                }
            }

            self.transition(SessionState::GetResponse { index, chain });
            let get_response = ApduCommand::get_response(self.channel.number, remaining);
            response = self.transmit(&get_response).await?;
        }
    }

    async fn transmit(&self, command: &ApduCommand) -> Result<ApduResponse> {
        trace!(command = %command, "Transmitting command");
        let response = self
            .service
            .transmit(self.channel.number, command)
            .await
            .map_err(|e| {
                debug!(error = %e, "Channel error during transmission");
                Error::Transmit(e)
            })?;
        trace!(
            response = %hex::encode_upper(response.data()),
            status = %response.status(),
            "Received response"
        );
        Ok(response)
    }

    /// Close the channel; a failure here is only logged
    pub(crate) async fn close(mut self) {
        self.transition(SessionState::Closing);
        let number = self.channel.number;
        match self.service.close_logical_channel(number).await {
            Ok(()) => debug!(channel = number, "Logical channel closed"),
            Err(error) => warn!(channel = number, %error, "Failed to close logical channel"),
        }
        self.transition(SessionState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannelService;
    use hex_literal::hex;

    #[test]
    fn test_logical_channel_from_open_response() {
        let raw = Bytes::from_static(&hex!("E00582030200009000"));
        let channel = LogicalChannel::from_open_response(&hex!("A000000559"), raw).unwrap();
        assert_eq!(channel.number(), 0xE0);
        assert_eq!(channel.select_response().as_ref(), hex!("0582030200009000"));

        let raw = Bytes::from_static(&[0x02]);
        let channel = LogicalChannel::from_open_response(&[], raw).unwrap();
        assert_eq!(channel.number(), 2);
        assert!(channel.select_response().is_empty());

        assert_eq!(
            LogicalChannel::from_open_response(&[], Bytes::new()),
            Err(Error::InvalidOpenResponse)
        );
    }

    #[tokio::test]
    async fn test_get_response_chain() {
        let service =
            MockChannelService::new(1, &[]).with_responses(&["AA6102", "BBBB6101", "CC9000"]);
        let channel = LogicalChannel::from_open_response(&[], Bytes::from_static(&[1])).unwrap();
        let mut session = Session::new(&service, channel, TransportConfig::default());

        let result = session
            .run(
                false,
                |_, builder| {
                    builder.add_apdu_header(0x80, 0xCA, 0x00, 0x00, 0x00)?;
                    Ok(())
                },
                |_| true,
            )
            .await
            .unwrap();
        session.close().await;

        assert_eq!(result.unwrap().as_ref(), hex!("AABBBBCC"));
        let sent = service.transmitted();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].to_bytes().as_ref(), hex!("01C0000002"));
        assert_eq!(sent[2].to_bytes().as_ref(), hex!("01C0000001"));
        assert_eq!(service.close_count(), 1);
    }

    #[tokio::test]
    async fn test_chain_limit() {
        let service =
            MockChannelService::new(1, &[]).with_responses(&["AA6101", "BB6101", "CC9000"]);
        let channel = LogicalChannel::from_open_response(&[], Bytes::from_static(&[1])).unwrap();
        let config = TransportConfig::new().with_max_get_response_chain(1);
        let mut session = Session::new(&service, channel, config);

        let result = session
            .run(
                false,
                |_, builder| {
                    builder.add_apdu_header(0x80, 0xCA, 0x00, 0x00, 0x00)?;
                    Ok(())
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err(Error::ChainLimitExceeded(1)));
        assert_eq!(service.transmitted().len(), 2);
    }
}
