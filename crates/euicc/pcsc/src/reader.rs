//! Reader representation for PC/SC devices

use pcsc::{ReaderState, State};

/// A PC/SC card reader as seen when listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcscReader {
    name: String,
    has_card: bool,
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Create a new reader
    pub const fn new(name: String, has_card: bool, atr: Option<Vec<u8>>) -> Self {
        Self {
            name,
            has_card,
            atr,
        }
    }

    pub(crate) fn from_reader_state(reader_state: &ReaderState) -> Self {
        let has_card = reader_state.event_state().contains(State::PRESENT)
            && !reader_state.event_state().contains(State::EMPTY);
        let atr = has_card.then(|| reader_state.atr().to_vec());

        Self {
            name: reader_state.name().to_string_lossy().into_owned(),
            has_card,
            atr,
        }
    }

    /// Reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a card is present in the reader
    pub const fn has_card(&self) -> bool {
        self.has_card
    }

    /// Answer To Reset of the card, if present
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }
}
