//! Constants used when talking to an eUICC over a logical channel
//!
//! Class bytes, instruction codes and parameter values from ISO/IEC 7816-4 and
//! GSMA SGP.22 that the transport needs to generate commands on its own.

/// Command classes
pub mod cla {
    /// ISO7816 inter-industry command class
    pub const ISO7816: u8 = 0x00;
    /// Class byte used for every STORE DATA block
    pub const STORE_DATA: u8 = 0x81;
}

/// Instruction codes
pub mod ins {
    /// MANAGE CHANNEL command
    pub const MANAGE_CHANNEL: u8 = 0x70;
    /// SELECT command
    pub const SELECT: u8 = 0xA4;
    /// GET RESPONSE command
    pub const GET_RESPONSE: u8 = 0xC0;
    /// STORE DATA command
    pub const STORE_DATA: u8 = 0xE2;
}

/// Parameter values for STORE DATA (P1)
pub mod store_data_p1 {
    /// More blocks follow
    pub const MORE_BLOCKS: u8 = 0x11;
    /// Last block
    pub const LAST_BLOCK: u8 = 0x91;
}

/// Maximum data length of a short APDU
pub const MAX_APDU_DATA_LEN: usize = 0xFF;

/// Maximum data length of an extended APDU
pub const MAX_EXTENDED_APDU_DATA_LEN: usize = 0xFFFF;

/// Number of STORE DATA blocks addressable through P2
pub const MAX_STORE_DATA_BLOCKS: usize = 0x100;
