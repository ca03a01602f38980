//! `gotosync sync` — one guarded synchronization pass.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gotosync_client::ApiClient;
use gotosync_core::config;
use gotosync_sync::{
    pipeline, ProgressLine, ProgressSink, RunOutcome, RunRequest, StoreModel,
    SyncError, SyncOptions,
};

/// Arguments for `gotosync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Product to synchronize: webinar, meeting, training or assist.
    /// Omit to sync every authorized product.
    #[arg(short, long)]
    pub product: Option<String>,

    /// Synchronize a single remote item instead of the whole catalog.
    #[arg(short, long)]
    pub id: Option<String>,

    /// Skip persisting event metadata and removing vanished events.
    #[arg(long = "excludeEvents", alias = "exclude-events")]
    pub exclude_events: bool,

    /// Skip registrant synchronization.
    #[arg(long = "excludeContacts", alias = "exclude-contacts")]
    pub exclude_contacts: bool,
}

impl SyncArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let config = config::resolve_at(home).context("failed to load gotosync config")?;
        let request = RunRequest {
            product: self.product,
            options: SyncOptions {
                id: self.id,
                exclude_events: self.exclude_events,
                exclude_contacts: self.exclude_contacts,
                verbose_errors: config.is_dev(),
            },
        };

        let client = ApiClient::new(&config);
        let mut model = StoreModel::new(&client, home);
        let mut console = Console;

        match pipeline::run(home, &request, &client, &mut model, &mut console) {
            Ok(RunOutcome::Skipped) => {
                println!("A sync for this selection is already running; nothing to do.");
                Ok(())
            }
            Ok(RunOutcome::NoProducts) => {
                println!("No GoTo product is authorized; nothing to sync.");
                Ok(())
            }
            Ok(RunOutcome::Completed(counters)) => {
                tracing::info!(
                    events = counters.events,
                    removed = counters.removed,
                    contacts = counters.contacts,
                    failed = counters.failed,
                    "sync finished"
                );
                Ok(())
            }
            // Already reported on the console.
            Err(SyncError::InvalidProduct(name)) => {
                anyhow::bail!("invalid product '{name}'")
            }
            Err(err) => Err(err).context("sync failed"),
        }
    }
}

/// Styles progress lines for a terminal.
struct Console;

impl ProgressSink for Console {
    fn emit(&mut self, line: ProgressLine) {
        match line {
            ProgressLine::Heading(text) => println!("{}", text.bold()),
            ProgressLine::Step(text) => println!("  {text}"),
            ProgressLine::Error(text) => println!("{}", text.red()),
            ProgressLine::Detail(text) => println!("{}", text.bright_black()),
            ProgressLine::Summary(text) => println!("{}", text.green()),
            ProgressLine::Done => println!("{}", "Done.".green().bold()),
        }
    }
}
