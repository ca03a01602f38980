//! The per-category, per-item synchronization loop.
//!
//! For every selected category:
//!
//! 1. Build the working set: the remote catalog, or a single requested id.
//! 2. Unless events are excluded: persist each item's metadata, then delete
//!    local items that vanished upstream. Failures here abort the run.
//! 3. Unless contacts are excluded: sync each item's registrants. A failing
//!    item is reported and skipped; the loop carries on with the next one.

use serde::Serialize;

use gotosync_core::{ProductCategory, ProductChoices, RemoteApi};

use crate::error::SyncError;
use crate::model::SyncModel;
use crate::progress::{ProgressLine, ProgressSink};

/// Per-run switches, straight from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Sync only this remote id instead of the whole catalog.
    pub id: Option<String>,
    pub exclude_events: bool,
    pub exclude_contacts: bool,
    /// Emit `Debug` detail for per-item failures (dev environment).
    pub verbose_errors: bool,
}

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounters {
    pub events: usize,
    pub removed: usize,
    pub contacts: usize,
    pub failed: usize,
}

pub struct Orchestrator<'a> {
    api: &'a dyn RemoteApi,
    model: &'a mut dyn SyncModel,
    options: SyncOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(api: &'a dyn RemoteApi, model: &'a mut dyn SyncModel, options: SyncOptions) -> Self {
        Self {
            api,
            model,
            options,
        }
    }

    /// Process `products` strictly in the given order.
    pub fn run(
        &mut self,
        products: &[ProductCategory],
        sink: &mut dyn ProgressSink,
    ) -> Result<SyncCounters, SyncError> {
        let mut counters = SyncCounters::default();

        for &category in products {
            sink.emit(ProgressLine::Heading(format!(
                "Synchronizing registrants for GoTo{}",
                category.label()
            )));
            tracing::info!("syncing GoTo{}", category.label());

            let choices = self.working_set(category)?;
            if !self.options.exclude_events {
                self.sync_events(category, &choices, &mut counters, sink)?;
            }
            if !self.options.exclude_contacts {
                self.sync_contacts(category, &choices, &mut counters, sink);
            }
        }

        sink.emit(ProgressLine::Summary(format!(
            "{} contacts synchronized.",
            counters.contacts
        )));
        sink.emit(ProgressLine::Done);
        Ok(counters)
    }

    fn working_set(&self, category: ProductCategory) -> Result<ProductChoices, SyncError> {
        match &self.options.id {
            Some(id) => Ok(ProductChoices::singleton(id)),
            None => Ok(self.api.fetch_choices(category)?),
        }
    }

    fn sync_events(
        &mut self,
        category: ProductCategory,
        choices: &ProductChoices,
        counters: &mut SyncCounters,
        sink: &mut dyn ProgressSink,
    ) -> Result<(), SyncError> {
        for (id, choice) in choices.iter() {
            sink.emit(ProgressLine::Step(format!("Persisting [{id}] to DB")));
            self.model.sync_product(category, id, choice, sink)?;
            counters.events += 1;
        }
        counters.removed += self
            .model
            .delete_removed_products(category, &choices.ids())?;
        Ok(())
    }

    fn sync_contacts(
        &mut self,
        category: ProductCategory,
        choices: &ProductChoices,
        counters: &mut SyncCounters,
        sink: &mut dyn ProgressSink,
    ) {
        for (id, choice) in choices.iter() {
            let description = choice.description().unwrap_or(id).to_owned();
            let name = event_name(&description, id);
            sink.emit(ProgressLine::Step(format!("Synchronizing: [{id}] {name}")));

            match self
                .model
                .sync_event(category, id, &name, &description, sink)
            {
                Ok(synced) => counters.contacts += synced,
                Err(err) => {
                    counters.failed += 1;
                    tracing::error!("GoTo{} item {id} failed: {err}", category.label());
                    sink.emit(ProgressLine::Error(format!(
                        "Error syncing {category}: {id}."
                    )));
                    sink.emit(ProgressLine::Error(err.to_string()));
                    if self.options.verbose_errors {
                        sink.emit(ProgressLine::Detail(format!("{err:?}")));
                    }
                }
            }
        }
    }
}

/// `<clean description>_#<id>`
pub fn event_name(description: &str, id: &str) -> String {
    format!("{}_#{id}", clean_string(description))
}

/// Reduce free text to a lowercase slug: ASCII alphanumerics are kept, every
/// run of anything else becomes a single `-`, and the ends are trimmed.
pub fn clean_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}
