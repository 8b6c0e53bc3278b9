//! Command queue construction for a transport session

use bytes::Bytes;
use tracing::trace;

use crate::command::ApduCommand;
use crate::constants::{
    MAX_APDU_DATA_LEN, MAX_EXTENDED_APDU_DATA_LEN, MAX_STORE_DATA_BLOCKS, cla, ins,
    store_data_p1,
};
use crate::error::{Error, Result};

/// Collects the commands a session executes on its logical channel
///
/// The builder is handed to the request provider once the channel is open. Commands are
/// executed in the order they were added.
#[derive(Debug)]
pub struct RequestBuilder {
    channel: u8,
    max_data_len: usize,
    commands: Vec<ApduCommand>,
}

impl RequestBuilder {
    /// Create a builder for `channel`
    ///
    /// STORE DATA blocks are limited to 255 bytes unless `extended` is set.
    pub const fn new(channel: u8, extended: bool) -> Self {
        Self {
            channel,
            max_data_len: if extended {
                MAX_EXTENDED_APDU_DATA_LEN
            } else {
                MAX_APDU_DATA_LEN
            },
            commands: Vec::new(),
        }
    }

    /// Channel number the commands are addressed to
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Largest data field a single command may carry
    pub const fn max_data_len(&self) -> usize {
        self.max_data_len
    }

    /// Queue a command; the channel number is ORed into `cla`
    ///
    /// Data longer than [`max_data_len`](Self::max_data_len) is rejected with
    /// [`Error::CommandTooLong`].
    pub fn add_apdu(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        p3: u16,
        data: impl Into<Bytes>,
    ) -> Result<&mut Self> {
        let data = data.into();
        if data.len() > self.max_data_len {
            return Err(Error::CommandTooLong { len: data.len(), max: self.max_data_len });
        }

        let command = ApduCommand::new(self.channel | cla, ins, p1, p2, p3, data);
        trace!(command = %command, "Queued APDU");
        self.commands.push(command);
        Ok(self)
    }

    /// Queue a command whose P3 is the length of `data`
    pub fn add_apdu_with_data(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: impl Into<Bytes>,
    ) -> Result<&mut Self> {
        let data = data.into();
        let Ok(p3) = u16::try_from(data.len()) else {
            return Err(Error::CommandTooLong { len: data.len(), max: self.max_data_len });
        };
        self.add_apdu(cla, ins, p1, p2, p3, data)
    }

    /// Queue a command without data
    pub fn add_apdu_header(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        p3: u16,
    ) -> Result<&mut Self> {
        self.add_apdu(cla, ins, p1, p2, p3, Bytes::new())
    }

    /// Queue `data` as a sequence of STORE DATA blocks
    ///
    /// At least one block is queued even when `data` is empty. P1 flags the last block and
    /// P2 carries the zero-based block number.
    pub fn add_store_data(&mut self, data: &[u8]) -> Result<&mut Self> {
        let blocks = data.len().div_ceil(self.max_data_len).max(1);
        if blocks > MAX_STORE_DATA_BLOCKS {
            return Err(Error::StoreDataTooLong(data.len()));
        }

        let mut chunks = data.chunks(self.max_data_len);
        for index in 0..blocks {
            let chunk = chunks.next().unwrap_or_default();
            let p1 = if index + 1 == blocks {
                store_data_p1::LAST_BLOCK
            } else {
                store_data_p1::MORE_BLOCKS
            };
            // P2 is the block number and fits by the check above
            let command = ApduCommand::new(
                cla::STORE_DATA,
                ins::STORE_DATA,
                p1,
                index as u8,
                chunk.len() as u16,
                Bytes::copy_from_slice(chunk),
            );
            trace!(command = %command, "Queued STORE DATA block");
            self.commands.push(command);
        }

        Ok(self)
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command has been queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queued commands in execution order
    pub fn commands(&self) -> &[ApduCommand] {
        &self.commands
    }

    pub(crate) fn into_commands(self) -> Vec<ApduCommand> {
        self.commands
    }
}
