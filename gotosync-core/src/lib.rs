//! gotosync core library: domain types, configuration and the remote seam.
//!
//! - [`types`] — product categories, catalog choices, credentials, contacts
//! - [`config`] — `~/.gotosync/config.yaml` load / save
//! - [`remote`] — the [`RemoteApi`] seam the sync engine talks to
//! - [`error`] — [`CoreError`]

pub mod config;
pub mod error;
pub mod remote;
pub mod types;

pub use config::{ApiConfig, Config, Environment};
pub use error::CoreError;
pub use remote::RemoteApi;
pub use types::{Contact, Credentials, ProductCategory, ProductChoice, ProductChoices};
