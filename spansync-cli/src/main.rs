//! spansync: keep marked-up record fields in sync.
//!
//! # Usage
//!
//! ```text
//! spansync [--home DIR] [-v] init
//! spansync record add <Type> --field NAME=VALUE...
//! spansync record list [--json]
//! spansync record show <id>
//! spansync sync <id> [--field N] [--dry-run] [--prefer upload|download]
//! spansync sync --all [--dry-run]
//! spansync diff <id> [--prefer upload|download]
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{diff::DiffArgs, init::InitArgs, record::RecordCommand, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "spansync",
    version,
    about = "Synchronize dependency and peer markers across records",
    long_about = None,
)]
struct Cli {
    /// Directory holding `.spansync/` (defaults to the user's home).
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Log more (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the collection with the default record types.
    Init(InitArgs),

    /// Add, list and inspect records.
    Record {
        #[command(subcommand)]
        command: RecordCommand,
    },

    /// Refresh dependency markers and reconcile peer markers.
    Sync(SyncArgs),

    /// Show a unified diff of what sync would change for a record.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let home = resolve_home(cli.home)?;
    tracing::debug!(home = %home.display(), "resolved home directory");

    match cli.command {
        Commands::Init(args) => args.run(&home),
        Commands::Record { command } => commands::record::run(command, &home),
        Commands::Sync(args) => args.run(&home),
        Commands::Diff(args) => args.run(&home),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(home) => Ok(home),
        None => dirs::home_dir().context("could not determine home directory"),
    }
}

/// Shared by commands that need an existing collection.
pub(crate) fn open_store(home: &Path) -> Result<spansync_core::FileStore> {
    spansync_core::FileStore::open_at(home)
        .context("failed to load collection; run `spansync init` first")
}
