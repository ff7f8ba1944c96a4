use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sysdump::config::Config;
use sysdump::core::{CreateParams, DumpManager, NotifyOutcome};
use sysdump::data::{DumpEntry, OriginatorType};
use sysdump::util;

#[derive(Parser)]
#[command(name = "sysdumpd")]
#[command(about = "Track and request host system dumps")]
struct Cli {
    /// Data directory (defaults to $SYSDUMP_DATA_DIR or /var/lib/sysdump)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data_dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to <data_dir>/logs/sysdump.log instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every known entry
    List,
    /// Show one entry
    Show { id: u32 },
    /// Request a new system dump from the host
    Create {
        #[arg(long)]
        originator_id: Option<String>,
        /// Client, Internal or SupportingService
        #[arg(long)]
        originator_type: Option<String>,
    },
    /// Record a capture-complete notification from the host
    Notify {
        /// Host-assigned dump id, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_source_id)]
        source_id: u32,
        size: u64,
    },
}

fn parse_source_id(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid source id {value:?}: {e}"))
}

fn init_logging(to_file: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    fs::create_dir_all(util::logs_dir())?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_entry(entry: &DumpEntry) {
    println!(
        "{:>6}  {:<11}  {:>12}  0x{:08x}  {}  {}",
        entry.id,
        entry.status,
        entry.size,
        entry.source_id,
        entry.timestamp_rfc3339(),
        entry.object_path
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_data_dir(cli.data_dir);
    init_logging(cli.log_file)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    // Held until exit so no other invocation touches the entries meanwhile
    let (manager, report) = DumpManager::from_config(&config)?;
    for skipped in &report.skipped {
        tracing::warn!(key = %skipped.key, reason = %skipped.reason, "Skipped persisted entry");
    }

    match cli.command {
        Command::List => {
            for entry in manager.entries() {
                print_entry(&entry);
            }
        }
        Command::Show { id } => {
            let entry = manager
                .entry(id)
                .ok_or_else(|| anyhow!("no entry with id {id}"))?;
            print_entry(&entry);
            println!("originator: {:?} ({})", entry.originator_id, entry.originator_type);
            println!("dump file:  {}", manager.dump_file_path(id).display());
        }
        Command::Create {
            originator_id,
            originator_type,
        } => {
            let mut params = CreateParams::new();
            if let Some(kind) = originator_type {
                let kind: OriginatorType = kind
                    .parse()
                    .map_err(|_| anyhow!("unknown originator type {kind:?}"))?;
                params = params.with_originator(originator_id.unwrap_or_default(), kind);
            } else if let Some(id) = originator_id {
                params.insert(sysdump::core::ORIGINATOR_ID_PARAM, id);
            }
            let path = manager.create_dump(params).await?;
            println!("{path}");
        }
        Command::Notify { source_id, size } => match manager.notify(source_id, size).await {
            Some(NotifyOutcome::Duplicate { entry_id }) => {
                println!("already recorded as entry {entry_id}");
            }
            Some(outcome) => {
                if let Some(entry) = outcome.entry() {
                    print_entry(entry);
                }
            }
            None => return Err(anyhow!("notification could not be recorded")),
        },
    }

    manager.flush_diagnostics().await;
    Ok(())
}
