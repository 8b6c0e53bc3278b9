use clap::{Parser, Subcommand};
use euicc_apdu::{ApduTransport, TransportConfig};
use euicc_transport_pcsc::{PcscConfig, PcscDeviceManager};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod reader;

use commands::*;
use reader::{find_reader_by_name, find_reader_with_card, list_readers};

#[derive(Parser)]
#[command(version, about = "Talk to an eUICC over PC/SC")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Send STORE DATA in extended length blocks
    #[arg(short, long)]
    extended: bool,

    /// Maximum GET RESPONSE round trips per command
    #[arg(long)]
    max_get_response_chain: Option<usize>,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    Readers,

    /// Read the EID
    Eid,

    /// Read the rules authorisation table, optionally checking a carrier against it
    Rat {
        /// Mobile country code of the carrier to check
        #[arg(long, requires = "mnc")]
        mcc: Option<String>,

        /// Mobile network code of the carrier to check
        #[arg(long, requires = "mcc")]
        mnc: Option<String>,

        /// Group identifier level 1, as hex
        #[arg(long, requires = "mcc")]
        gid1: Option<String>,

        /// Group identifier level 2, as hex
        #[arg(long, requires = "mcc")]
        gid2: Option<String>,

        /// Policy rule to check
        #[arg(long, value_enum, default_value = "do-not-delete")]
        policy: PolicyRule,
    },

    /// Send raw STORE DATA to an application
    StoreData {
        /// Application identifier, as hex
        #[arg(long, default_value = ISD_R_AID)]
        aid: String,

        /// Data to send, as hex
        #[arg(required = true)]
        data: String,
    },

    /// Decode a BER-TLV hex dump
    Decode {
        /// Data to decode, as hex
        #[arg(required = true)]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let manager = match &cli.command {
        Commands::Decode { data } => return decode_command(data),
        Commands::Readers => {
            let manager = PcscDeviceManager::new()?;
            return list_readers(&manager);
        }
        _ => PcscDeviceManager::new()?,
    };

    let reader = match &cli.reader {
        Some(reader_name) => find_reader_by_name(&manager, reader_name)?,
        None => find_reader_with_card(&manager)?,
    };
    info!("Using reader: {}", reader.name());

    let service = manager.open_reader_with_config(
        reader.name(),
        PcscConfig::default().with_extended_length(cli.extended),
    )?;
    let config = match cli.max_get_response_chain {
        Some(max) => TransportConfig::new().with_max_get_response_chain(max),
        None => TransportConfig::new(),
    };
    let transport = ApduTransport::with_config(service, config);

    match cli.command {
        Commands::Readers | Commands::Decode { .. } => unreachable!(), // Already handled above
        Commands::Eid => eid_command(&transport, cli.extended).await?,
        Commands::Rat {
            mcc,
            mnc,
            gid1,
            gid2,
            policy,
        } => {
            let query = mcc.zip(mnc).map(|(mcc, mnc)| CarrierQuery {
                mcc,
                mnc,
                gid1,
                gid2,
                policy,
            });
            rat_command(&transport, cli.extended, query).await?
        }
        Commands::StoreData { aid, data } => {
            store_data_command(&transport, cli.extended, &aid, &data).await?
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, &directives))
        .with_ansi(true)
        .init();
}

/// `RUST_LOG` style directives win; otherwise `--verbose` picks TRACE over INFO
fn log_filter(verbose: bool, directives: &str) -> EnvFilter {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}
