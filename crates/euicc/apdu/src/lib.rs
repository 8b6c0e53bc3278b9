//! Chained APDU transport for eUICC logical channels
//!
//! This crate executes multi-command sequences against an eUICC over a logical channel
//! provided by a [`CardChannelService`].
//!
//! ## Overview
//!
//! A transport session:
//!
//! - opens a logical channel with the target application selected
//! - lets a request provider queue commands through a [`RequestBuilder`], including
//!   STORE DATA payloads split into numbered blocks
//! - executes the queue in order, following `61XX` GET RESPONSE chains
//! - closes the channel and reports the last command's data or the first failure
//!
//! Only one session runs per [`ApduTransport`] at any time.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod channel;
pub mod command;
pub mod config;
pub mod constants;
pub mod request;
pub mod response;
pub mod transport;

mod error;
mod session;

pub use channel::{CardChannelService, ChannelError};
pub use command::ApduCommand;
pub use config::TransportConfig;
pub use error::{Error, Result};
pub use request::RequestBuilder;
pub use response::ApduResponse;
pub use response::status::StatusWord;
pub use session::{LogicalChannel, SessionState};
pub use transport::{ApduTransport, ResultCallback};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        ApduCommand, ApduResponse, ApduTransport, Bytes, BytesMut, CardChannelService,
        ChannelError, Error, RequestBuilder, Result, ResultCallback, StatusWord,
        TransportConfig,
    };
}
