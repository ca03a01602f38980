//! Guarded sync entrypoint used by the CLI.
//!
//! `acquire lock → resolve categories → orchestrate → release lock`. The lock
//! is owned by this function for the whole run, so it is released on every
//! path out of it, including `?` returns.

use std::path::Path;

use gotosync_core::RemoteApi;

use crate::error::SyncError;
use crate::model::SyncModel;
use crate::orchestrator::{Orchestrator, SyncCounters, SyncOptions};
use crate::progress::{ProgressLine, ProgressSink};
use crate::run_lock::{run_key, RunLock};
use crate::selector;

/// What the user asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Requested product name, unvalidated.
    pub product: Option<String>,
    pub options: SyncOptions,
}

impl RunRequest {
    pub fn key(&self) -> String {
        run_key(self.product.as_deref(), self.options.id.as_deref())
    }
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run with the same key holds the lock; nothing was done.
    Skipped,
    /// No category is authorized; nothing was done.
    NoProducts,
    Completed(SyncCounters),
}

/// Perform one guarded synchronization pass.
pub fn run(
    home: &Path,
    request: &RunRequest,
    api: &dyn RemoteApi,
    model: &mut dyn SyncModel,
    sink: &mut dyn ProgressSink,
) -> Result<RunOutcome, SyncError> {
    let key = request.key();
    let Some(lock) = RunLock::acquire_at(home, &key)? else {
        return Ok(RunOutcome::Skipped);
    };

    let products = match selector::resolve(request.product.as_deref(), api) {
        Ok(products) => products,
        Err(err) => {
            if let SyncError::InvalidProduct(name) = &err {
                sink.emit(ProgressLine::Error(format!("Invalid product: {name}. Aborted")));
            }
            lock.release()?;
            return Err(err);
        }
    };

    if products.is_empty() {
        tracing::info!("no authorized GoTo products; nothing to sync");
        lock.release()?;
        return Ok(RunOutcome::NoProducts);
    }

    let counters =
        Orchestrator::new(api, model, request.options.clone()).run(&products, sink)?;
    lock.release()?;
    Ok(RunOutcome::Completed(counters))
}
