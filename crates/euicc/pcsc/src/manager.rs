//! Device manager for PC/SC operations

use pcsc::{Context, Scope};
use tracing::debug;

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::service::PcscChannelService;

/// Lists readers and opens channel services on them
#[allow(missing_debug_implementations)]
pub struct PcscDeviceManager {
    context: Context,
}

impl PcscDeviceManager {
    /// Establish a PC/SC context
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = self.context.list_readers_owned()?;
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());
        for reader_name in readers {
            let mut reader_states = vec![pcsc::ReaderState::new(
                reader_name.as_c_str(),
                pcsc::State::UNAWARE,
            )];

            match self.context.get_status_change(None, &mut reader_states) {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(e) => {
                    debug!(error = %e, reader = ?reader_name, "Reader status unavailable");
                    result.push(PcscReader::new(
                        reader_name.to_string_lossy().into_owned(),
                        false,
                        None,
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Open a channel service on a specific reader
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscChannelService, PcscError> {
        self.open_reader_with_config(reader_name, PcscConfig::default())
    }

    /// Open a channel service on a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscChannelService, PcscError> {
        PcscChannelService::connect(self.context.clone(), reader_name, config)
    }

    /// Open a channel service on the first reader holding a card
    pub fn open_first_card(&self, config: PcscConfig) -> Result<PcscChannelService, PcscError> {
        let reader = self
            .list_readers()?
            .into_iter()
            .find(PcscReader::has_card)
            .ok_or_else(|| PcscError::NoCard("any reader".to_string()))?;
        self.open_reader_with_config(reader.name(), config)
    }
}
