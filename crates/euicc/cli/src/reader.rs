use colored::Colorize;
use euicc_transport_pcsc::{PcscDeviceManager, PcscReader};

/// Find a reader with a specific name
pub(crate) fn find_reader_by_name(
    manager: &PcscDeviceManager,
    reader_name: &str,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    readers
        .into_iter()
        .find(|r| r.name() == reader_name)
        .ok_or_else(|| format!("Reader '{reader_name}' not found").into())
}

/// Find a reader with a card inserted
pub(crate) fn find_reader_with_card(
    manager: &PcscDeviceManager,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        return Err("No readers found!".into());
    }

    readers
        .into_iter()
        .find(PcscReader::has_card)
        .ok_or_else(|| "No card found in any reader!".into())
}

/// List all available readers
pub(crate) fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present".green()
        } else {
            "no card".yellow()
        };
        match reader.atr() {
            Some(atr) => println!(
                "{}. {} ({}, ATR {})",
                i + 1,
                reader.name(),
                status,
                hex::encode_upper(atr)
            ),
            None => println!("{}. {} ({})", i + 1, reader.name(), status),
        }
    }

    Ok(())
}
