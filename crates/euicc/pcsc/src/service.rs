//! Logical channel service backed by a PC/SC card connection

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use euicc_apdu::constants::{cla, ins};
use euicc_apdu::{ApduCommand, ApduResponse, CardChannelService, ChannelError, StatusWord};
use parking_lot::Mutex;
use pcsc::{Card, Context, Disposition};
use tracing::{debug, trace, warn};

use crate::config::PcscConfig;
use crate::error::PcscError;

/// P1 of MANAGE CHANNEL closing a channel
const MANAGE_CHANNEL_CLOSE: u8 = 0x80;
/// P1 of SELECT by DF name
const SELECT_BY_NAME: u8 = 0x04;

/// Class byte addressing `channel` with the ISO 7816-4 encoding
///
/// Channels 0 to 3 use the basic interindustry class, 4 to 19 the further one.
pub const fn logical_channel_cla(channel: u8) -> u8 {
    if channel < 4 {
        cla::ISO7816 | channel
    } else {
        0x40 | ((channel - 4) & 0x0F)
    }
}

/// Card connection shared by every channel of one reader
struct Connection {
    context: Context,
    card: Option<Card>,
    reader_name: String,
    config: PcscConfig,
}

impl Connection {
    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                debug!(reader = %self.reader_name, "Connected to card");
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;
        let Some(card) = &mut self.card else {
            return Err(PcscError::NoCard(self.reader_name.clone()));
        };

        trace!(command = %hex::encode_upper(command), "Transmitting raw command");
        let mut response_buffer = vec![0u8; self.config.response_buffer_len()];
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "Received raw response");
                Ok(Bytes::copy_from_slice(response))
            }
            Err(e) => {
                if matches!(e, pcsc::Error::ResetCard | pcsc::Error::RemovedCard) {
                    self.card = None;
                    if self.config.auto_reconnect
                        && e == pcsc::Error::ResetCard
                        && self.connect_card().is_ok()
                    {
                        return self.transmit_raw(command);
                    }
                }
                Err(e.into())
            }
        }
    }

    fn exchange(&mut self, command: &ApduCommand) -> Result<ApduResponse, ChannelError> {
        let raw = self.transmit_raw(&command.to_bytes())?;
        ApduResponse::from_bytes(&raw)
    }

    /// Exchange `command`, answering `61XX` with GET RESPONSE on the same class byte
    fn exchange_chained(
        &mut self,
        command: &ApduCommand,
    ) -> Result<(Bytes, StatusWord), ChannelError> {
        let mut data = BytesMut::new();
        let mut response = self.exchange(command)?;
        loop {
            let (chunk, status) = response.into_parts();
            data.put_slice(&chunk);
            let Some(remaining) = status.remaining_bytes() else {
                return Ok((data.freeze(), status));
            };
            response = self.exchange(&ApduCommand::get_response(command.cla, remaining))?;
        }
    }

    fn open_channel(&mut self, aid: &[u8]) -> Result<Bytes, ChannelError> {
        let manage = ApduCommand::header(cla::ISO7816, ins::MANAGE_CHANNEL, 0x00, 0x00, 1);
        let response = self.exchange(&manage)?;
        let channel = match response.data().first() {
            Some(&channel) if response.is_success() => channel,
            _ => {
                debug!(status = %response.status(), "MANAGE CHANNEL refused");
                return Err(ChannelError::NoChannelAvailable);
            }
        };

        let select = ApduCommand::new(
            logical_channel_cla(channel),
            ins::SELECT,
            SELECT_BY_NAME,
            0x00,
            aid.len() as u16,
            Bytes::copy_from_slice(aid),
        );
        let selected = self.exchange_chained(&select);
        let (data, status) = match selected {
            Ok((data, status)) if status.is_success() => (data, status),
            other => {
                if let Err(error) = self.close_channel(channel) {
                    warn!(channel, %error, "Failed to close channel after SELECT");
                }
                let (_, status) = other?;
                return Err(ChannelError::SelectFailed(status));
            }
        };

        debug!(channel, aid = %hex::encode_upper(aid), "Application selected");
        let mut open = BytesMut::with_capacity(data.len() + 3);
        open.put_u8(channel);
        open.put_slice(&data);
        open.put_u8(status.sw1);
        open.put_u8(status.sw2);
        Ok(open.freeze())
    }

    fn close_channel(&mut self, channel: u8) -> Result<(), ChannelError> {
        let close = ApduCommand::header(
            cla::ISO7816,
            ins::MANAGE_CHANNEL,
            MANAGE_CHANNEL_CLOSE,
            channel,
            0,
        );
        let response = self.exchange(&close)?;
        if !response.is_success() {
            return Err(ChannelError::other(format!(
                "MANAGE CHANNEL close returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                debug!(error = %e, "Failed to disconnect card");
            }
        }
    }
}

/// [`CardChannelService`] talking to a card in a PC/SC reader
///
/// Blocking PC/SC calls run on the tokio blocking pool; the connection is shared behind a
/// mutex so concurrent calls are serialized.
#[derive(Clone)]
pub struct PcscChannelService {
    inner: Arc<Mutex<Connection>>,
    reader_name: String,
}

impl fmt::Debug for PcscChannelService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connection = self.inner.lock();
        f.debug_struct("PcscChannelService")
            .field("reader_name", &self.reader_name)
            .field("has_card", &connection.card.is_some())
            .field("config", &connection.config)
            .finish()
    }
}

impl PcscChannelService {
    pub(crate) fn connect(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut connection = Connection {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        };
        connection.connect_card()?;

        Ok(Self {
            inner: Arc::new(Mutex::new(connection)),
            reader_name: reader_name.to_string(),
        })
    }

    /// Reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// ATR of the connected card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        let connection = self.inner.lock();
        connection.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| Ok(card.get_attribute_owned(pcsc::Attribute::AtrString)?),
        )
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ChannelError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, ChannelError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&mut inner.lock()))
            .await
            .map_err(|e| ChannelError::other(format!("PC/SC task failed: {e}")))?
    }
}

#[async_trait]
impl CardChannelService for PcscChannelService {
    async fn open_logical_channel(&self, aid: &[u8]) -> Result<Bytes, ChannelError> {
        let aid = aid.to_vec();
        self.blocking(move |connection| connection.open_channel(&aid))
            .await
    }

    async fn transmit(
        &self,
        _channel: u8,
        command: &ApduCommand,
    ) -> Result<ApduResponse, ChannelError> {
        let command = command.clone();
        self.blocking(move |connection| connection.exchange(&command))
            .await
    }

    async fn close_logical_channel(&self, channel: u8) -> Result<(), ChannelError> {
        self.blocking(move |connection| connection.close_channel(channel))
            .await
    }
}
