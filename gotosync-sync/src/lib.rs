//! # gotosync-sync
//!
//! Run moderation and sync orchestration.
//!
//! Call [`pipeline::run`] to perform one guarded synchronization pass: it
//! takes the [`RunLock`], resolves the categories to process with
//! [`selector::resolve`], drives the [`Orchestrator`] and releases the lock
//! on every exit path.

pub mod error;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod run_lock;
pub mod selector;
pub mod store;

pub use error::SyncError;
pub use model::SyncModel;
pub use orchestrator::{clean_string, event_name, Orchestrator, SyncCounters, SyncOptions};
pub use pipeline::{RunOutcome, RunRequest};
pub use progress::{ProgressLine, ProgressSink};
pub use run_lock::{LockRecord, RunLock};
pub use store::{EventRecord, EventStore, StoreModel};
