//! gotosync — pull GoTo registrants into a local event store.
//!
//! # Usage
//!
//! ```text
//! gotosync sync [--product webinar|meeting|training|assist] [--id <id>]
//!               [--excludeEvents] [--excludeContacts]
//! gotosync status [--json]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gotosync",
    version,
    about = "Synchronize GoTo webinar, meeting, training and assist registrants",
    long_about = None,
)]
struct Cli {
    /// Directory holding `.gotosync/` (defaults to the user home directory).
    #[arg(long, global = true, hide = true)]
    home: Option<PathBuf>,

    /// Increase diagnostic output on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize events and registrants from the remote API.
    Sync(SyncArgs),

    /// Show locally stored events and any running syncs.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let home = match cli.home {
        Some(home) => home,
        None => dirs::home_dir().context("could not determine home directory")?,
    };
    match cli.command {
        Commands::Sync(args) => args.run(&home),
        Commands::Status(args) => args.run(&home),
    }
}

/// `RUST_LOG` wins; otherwise the level follows `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
