//! `gotosync status` — what the local store holds and which runs are live.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gotosync_core::ProductCategory;
use gotosync_sync::{store::store_path_at, EventStore, LockRecord, RunLock};

/// Arguments for `gotosync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let report = build_report(home)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    synced_at: Option<DateTime<Utc>>,
    events: Vec<EventStatus>,
    running: Vec<LockRecord>,
}

#[derive(Debug, Serialize)]
struct EventStatus {
    product: ProductCategory,
    id: String,
    title: String,
    contacts: usize,
    updated_at: DateTime<Utc>,
}

#[derive(Tabled)]
struct EventTableRow {
    #[tabled(rename = "product")]
    product: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "contacts")]
    contacts: usize,
    #[tabled(rename = "updated")]
    updated: String,
}

fn build_report(home: &Path) -> Result<StatusReport> {
    let store = EventStore::open_at(home).context("failed to open the local event store")?;
    let synced_at = store_path_at(home)
        .exists()
        .then(|| store.data().synced_at);

    let events = ProductCategory::ALL
        .into_iter()
        .flat_map(|category| {
            store.events(category).map(move |record| EventStatus {
                product: category,
                id: record.remote_id.clone(),
                title: record.title.clone(),
                contacts: record.contacts.len(),
                updated_at: record.updated_at,
            })
        })
        .collect();

    let running = RunLock::list_at(home).context("failed to inspect run locks")?;
    Ok(StatusReport {
        synced_at,
        events,
        running,
    })
}

fn print_table(report: &StatusReport) {
    let last_sync = report
        .synced_at
        .map(|at| format!("{} ago", format_age(at)))
        .unwrap_or_else(|| "never".to_string());
    println!(
        "gotosync v{} | {} events | last sync {}",
        env!("CARGO_PKG_VERSION"),
        report.events.len(),
        last_sync,
    );

    for lock in &report.running {
        let key = if lock.key.is_empty() {
            "all products"
        } else {
            lock.key.as_str()
        };
        println!(
            "{} sync '{}' running (pid {}, started {} ago)",
            "■".yellow().bold(),
            key,
            lock.pid,
            format_age(lock.started_at),
        );
    }

    if report.events.is_empty() {
        println!("No events synchronized yet.");
        return;
    }

    let rows: Vec<EventTableRow> = report
        .events
        .iter()
        .map(|event| EventTableRow {
            product: format!("GoTo{}", event.product.label()),
            id: event.id.clone(),
            title: event.title.clone(),
            contacts: event.contacts,
            updated: format_age(event.updated_at),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);
    match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 60 * 60 => format!("{}m", s / 60),
        s if s < 60 * 60 * 24 => format!("{}h", s / (60 * 60)),
        s => format!("{}d", s / (60 * 60 * 24)),
    }
}
