//! Error types for the PC/SC channel service

use euicc_apdu::ChannelError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),
}

impl From<PcscError> for ChannelError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(
                pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::ResetCard,
            ) => Self::Connection,
            PcscError::Pcsc(e) => Self::driver(e.to_string()),
            PcscError::NoReadersAvailable | PcscError::ReaderNotFound(_) | PcscError::NoCard(_) => {
                Self::Connection
            }
        }
    }
}
