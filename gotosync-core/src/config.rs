//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gotosync/
//!   config.yaml   (mode 0600, holds the client secret)
//! ```
//!
//! # API pattern
//!
//! Every function that touches disk has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Environment overrides (`GOTOSYNC_CLIENT_ID`, `GOTOSYNC_CLIENT_SECRET`,
//! `GOTOSYNC_ENV`) are applied by [`Config::with_env_overrides`] so that the
//! file on disk never has to carry secrets in CI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Credentials, ProductCategory};

pub const DEFAULT_BASE_URL: &str = "https://api.getgo.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_CLIENT_ID: &str = "GOTOSYNC_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "GOTOSYNC_CLIENT_SECRET";
pub const ENV_ENVIRONMENT: &str = "GOTOSYNC_ENV";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deployment environment. `dev` turns on verbose per-item error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Dev,
}

/// Remote API endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Overrides the organizer key returned by the token exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            organizer_key: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub api: ApiConfig,
    /// Categories the integration is enabled for; `None` means all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductCategory>>,
    #[serde(default)]
    pub environment: Environment,
}

impl Config {
    pub fn product_enabled(&self, category: ProductCategory) -> bool {
        self.products
            .as_ref()
            .map(|enabled| enabled.contains(&category))
            .unwrap_or(true)
    }

    pub fn is_dev(&self) -> bool {
        self.environment == Environment::Dev
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    ///
    /// Empty values are ignored; an unknown `GOTOSYNC_ENV` value leaves the
    /// configured environment unchanged.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(id) = non_empty(ENV_CLIENT_ID) {
            self.credentials.client_id = id;
        }
        if let Some(secret) = non_empty(ENV_CLIENT_SECRET) {
            self.credentials.client_secret = secret;
        }
        match non_empty(ENV_ENVIRONMENT).as_deref() {
            Some("dev") => self.environment = Environment::Dev,
            Some("prod") => self.environment = Environment::Prod,
            _ => {}
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.gotosync/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".gotosync")
}

/// `<home>/.gotosync/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load `config.yaml`. A missing file yields the default configuration.
///
/// Returns `CoreError::ConfigParse` (with path + line context) if malformed.
pub fn load_at(home: &Path) -> Result<Config, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::ConfigParse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, CoreError> {
    load_at(&home()?)
}

/// Load `config.yaml` and apply environment overrides from the process env.
pub fn resolve_at(home: &Path) -> Result<Config, CoreError> {
    Ok(load_at(home)?.with_env_overrides(|key| std::env::var(key).ok()))
}

/// Atomically save `config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), CoreError> {
    let dir = root_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), CoreError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
