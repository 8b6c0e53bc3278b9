//! Scripted channel service for session tests

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{CardChannelService, ChannelError};
use crate::command::ApduCommand;
use crate::response::ApduResponse;

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<Bytes>,
    transmitted: Vec<ApduCommand>,
    open_count: usize,
    close_count: usize,
}

/// Channel service answering transmits from a queue of raw responses
#[derive(Debug)]
pub(crate) struct MockChannelService {
    open_response: Bytes,
    fail_open: bool,
    fail_close: bool,
    stall_transmit: bool,
    state: Mutex<MockState>,
}

impl MockChannelService {
    /// Service handing out `channel` with the given select response
    pub(crate) fn new(channel: u8, select_response: &[u8]) -> Self {
        let mut open = Vec::with_capacity(select_response.len() + 1);
        open.push(channel);
        open.extend_from_slice(select_response);
        Self {
            open_response: Bytes::from(open),
            fail_open: false,
            fail_close: false,
            stall_transmit: false,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Queue responses given as hex strings (data followed by SW1 SW2)
    pub(crate) fn with_responses(self, responses: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            for response in responses {
                state
                    .responses
                    .push_back(Bytes::from(hex::decode(response).unwrap()));
            }
        }
        self
    }

    pub(crate) fn with_open_response(mut self, open_response: &[u8]) -> Self {
        self.open_response = Bytes::copy_from_slice(open_response);
        self
    }

    pub(crate) const fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) const fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Transmits never complete once the response queue is exhausted
    pub(crate) const fn stalling_transmit(mut self) -> Self {
        self.stall_transmit = true;
        self
    }

    pub(crate) fn transmitted(&self) -> Vec<ApduCommand> {
        self.state.lock().transmitted.clone()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.lock().close_count
    }
}

#[async_trait]
impl CardChannelService for MockChannelService {
    async fn open_logical_channel(&self, _aid: &[u8]) -> Result<Bytes, ChannelError> {
        self.state.lock().open_count += 1;
        if self.fail_open {
            return Err(ChannelError::NoChannelAvailable);
        }
        Ok(self.open_response.clone())
    }

    async fn transmit(
        &self,
        _channel: u8,
        command: &ApduCommand,
    ) -> Result<ApduResponse, ChannelError> {
        let raw = {
            let mut state = self.state.lock();
            state.transmitted.push(command.clone());
            state.responses.pop_front()
        };
        match raw {
            Some(raw) => ApduResponse::from_bytes(&raw),
            None if self.stall_transmit => std::future::pending().await,
            None => Err(ChannelError::Transmission),
        }
    }

    async fn close_logical_channel(&self, _channel: u8) -> Result<(), ChannelError> {
        self.state.lock().close_count += 1;
        if self.fail_close {
            return Err(ChannelError::other("close rejected"));
        }
        Ok(())
    }
}
