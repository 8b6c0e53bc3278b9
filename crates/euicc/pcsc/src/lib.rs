//! PC/SC logical channel service for eUICC transports
//!
//! This crate implements [`CardChannelService`](euicc_apdu::CardChannelService) on top of
//! a PC/SC reader. Opening a channel issues MANAGE CHANNEL followed by SELECT by AID on
//! the new channel; closing issues MANAGE CHANNEL close.
//!
//! # Examples
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use euicc_apdu::ApduTransport;
//! use euicc_transport_pcsc::{PcscConfig, PcscDeviceManager};
//!
//! let manager = PcscDeviceManager::new()?;
//! let service = manager.open_first_card(PcscConfig::default())?;
//! let transport = ApduTransport::new(service);
//!
//! let isd_r = hex::decode("A0000005591010FFFFFFFF8900000100")?;
//! let eid = transport
//!     .execute(
//!         &isd_r,
//!         false,
//!         |_, request| request.add_store_data(&[0xBF, 0x3E, 0x03, 0x5C, 0x01, 0x5A]).map(|_| ()),
//!         |_| true,
//!     )
//!     .await?;
//! println!("{:?}", eid);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod manager;
pub mod reader;
pub mod service;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use service::{PcscChannelService, logical_channel_cla};
