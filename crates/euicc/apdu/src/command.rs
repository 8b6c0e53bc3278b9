//! APDU command definitions
//!
//! This module provides the command type handed to a
//! [`CardChannelService`](crate::CardChannelService), following the
//! CLA/INS/P1/P2/P3 layout of ISO/IEC 7816-4.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::ins;

/// Generic APDU command structure
///
/// `p3` is the Lc byte when `data` is non-empty and the Le byte otherwise,
/// the way a T=0 transmission primitive expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Parameter 3 (Lc or Le)
    pub p3: u16,
    /// Command data, possibly empty
    pub data: Bytes,
}

impl ApduCommand {
    /// Create a new command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, p3: u16, data: impl Into<Bytes>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            p3,
            data: data.into(),
        }
    }

    /// Create a new command with just the header bytes and P3
    pub const fn header(cla: u8, ins: u8, p1: u8, p2: u8, p3: u16) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            p3,
            data: Bytes::new(),
        }
    }

    /// Create a GET RESPONSE command on the given channel
    pub const fn get_response(channel: u8, le: u8) -> Self {
        Self::header(channel, ins::GET_RESPONSE, 0x00, 0x00, le as u16)
    }

    /// Whether the command needs extended length encoding
    pub const fn is_extended(&self) -> bool {
        self.data.len() > 0xFF || self.p3 > 0xFF
    }

    /// Convert to raw APDU bytes
    ///
    /// Data is encoded with a one byte Lc up to 255 bytes and a three byte extended Lc up to
    /// 65535 bytes. [`RequestBuilder`](crate::RequestBuilder) never queues longer data.
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if self.data.is_empty() {
            // Le only
            if self.p3 > 0xFF {
                buffer.put_u8(0x00);
                buffer.put_u16(self.p3);
            } else {
                buffer.put_u8(self.p3 as u8);
            }
        } else if self.data.len() > 0xFF {
            buffer.put_u8(0x00);
            buffer.put_u16(self.data.len() as u16);
            buffer.put_slice(&self.data);
        } else {
            buffer.put_u8(self.data.len() as u8);
            buffer.put_slice(&self.data);
        }

        buffer.freeze()
    }

    /// Calculate length of serialized command
    pub const fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        let p3_len = if self.is_extended() { 3 } else { 1 };
        4 + p3_len + self.data.len()
    }
}

impl fmt::Display for ApduCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}{:02X}{:02X}{:02X}{:02X}{}",
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            self.p3,
            hex::encode_upper(&self.data)
        )
    }
}
