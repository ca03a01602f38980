//! File-backed event store and the [`SyncModel`] built on it.
//!
//! Persists an `EventStoreFile` JSON document at
//! `<home>/.gotosync/events.json`. Runs with different run keys may share a
//! home, so a save never writes back the snapshot loaded at open time:
//! mutations are recorded as [`Change`]s, and [`EventStore::save`] takes the
//! store lock, re-reads the file, replays the recorded changes onto it and
//! writes the result with the atomic `.tmp` + rename pattern.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gotosync_core::{Contact, ProductCategory, ProductChoice, RemoteApi};

use crate::error::{io_err, SyncError};
use crate::model::SyncModel;
use crate::progress::ProgressSink;
use crate::run_lock::RunLock;

const STORE_LOCK_KEY: &str = "events";
const STORE_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Locally stored remote item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub remote_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Contacts keyed by lowercased email.
    #[serde(default)]
    pub contacts: BTreeMap<String, Contact>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    fn new(id: &str, title: &str, now: DateTime<Utc>) -> Self {
        Self {
            remote_id: id.to_owned(),
            title: title.to_owned(),
            event_name: None,
            contacts: BTreeMap::new(),
            updated_at: now,
        }
    }
}

/// On-disk store payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStoreFile {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub events: BTreeMap<ProductCategory, BTreeMap<String, EventRecord>>,
}

impl Default for EventStoreFile {
    fn default() -> Self {
        Self {
            synced_at: Utc::now(),
            events: BTreeMap::new(),
        }
    }
}

/// `<home>/.gotosync/events.json`
pub fn store_path_at(home: &Path) -> PathBuf {
    home.join(".gotosync").join("events.json")
}

/// `<home>/.gotosync/locks/`, kept apart from run locks so `status` never
/// reports the store lock as a running sync.
pub fn store_lock_dir_at(home: &Path) -> PathBuf {
    home.join(".gotosync").join("locks")
}

/// A recorded mutation, replayed onto the latest file contents on save.
#[derive(Debug, Clone)]
enum Change {
    Upsert {
        category: ProductCategory,
        id: String,
        title: String,
    },
    Ensure {
        category: ProductCategory,
        id: String,
    },
    Retain {
        category: ProductCategory,
        keep: Vec<String>,
    },
    Merge {
        category: ProductCategory,
        id: String,
        event_name: String,
        title: String,
        contacts: Vec<Contact>,
    },
}

impl Change {
    /// Apply to `data`. Returns the number of removed events for `Retain`,
    /// of distinct merged contacts for `Merge`, and 0 otherwise.
    fn apply(&self, data: &mut EventStoreFile) -> usize {
        let now = Utc::now();
        match self {
            Change::Upsert {
                category,
                id,
                title,
            } => {
                data.events
                    .entry(*category)
                    .or_default()
                    .entry(id.clone())
                    .and_modify(|record| {
                        record.title = title.clone();
                        record.updated_at = now;
                    })
                    .or_insert_with(|| EventRecord::new(id, title, now));
                0
            }
            Change::Ensure { category, id } => {
                data.events
                    .entry(*category)
                    .or_default()
                    .entry(id.clone())
                    .or_insert_with(|| EventRecord::new(id, id, now));
                0
            }
            Change::Retain { category, keep } => {
                let Some(events) = data.events.get_mut(category) else {
                    return 0;
                };
                let before = events.len();
                events.retain(|id, _| keep.contains(id));
                before - events.len()
            }
            Change::Merge {
                category,
                id,
                event_name,
                title,
                contacts,
            } => {
                let record = data
                    .events
                    .entry(*category)
                    .or_default()
                    .entry(id.clone())
                    .or_insert_with(|| EventRecord::new(id, title, now));
                let batch: BTreeMap<String, Contact> = contacts
                    .iter()
                    .map(|c| (c.email.to_ascii_lowercase(), c.clone()))
                    .collect();
                let merged = batch.len();
                record.contacts.extend(batch);
                record.event_name = Some(event_name.clone());
                record.updated_at = now;
                merged
            }
        }
    }
}

pub struct EventStore {
    path: PathBuf,
    lock_dir: PathBuf,
    data: EventStoreFile,
    pending: Vec<Change>,
}

impl EventStore {
    /// Load the store under `home`. A missing file yields an empty store.
    pub fn open_at(home: &Path) -> Result<Self, SyncError> {
        let path = store_path_at(home);
        let data = read_store(&path)?;
        Ok(Self {
            path,
            lock_dir: store_lock_dir_at(home),
            data,
            pending: Vec::new(),
        })
    }

    pub fn data(&self) -> &EventStoreFile {
        &self.data
    }

    pub fn events(&self, category: ProductCategory) -> impl Iterator<Item = &EventRecord> {
        self.data
            .events
            .get(&category)
            .into_iter()
            .flat_map(|events| events.values())
    }

    pub fn get(&self, category: ProductCategory, id: &str) -> Option<&EventRecord> {
        self.data.events.get(&category).and_then(|e| e.get(id))
    }

    /// Create or retitle an event.
    pub fn upsert_event(&mut self, category: ProductCategory, id: &str, title: &str) {
        self.record(Change::Upsert {
            category,
            id: id.to_owned(),
            title: title.to_owned(),
        });
    }

    /// Create an event titled by its id unless one exists; an existing
    /// title is kept.
    pub fn ensure_event(&mut self, category: ProductCategory, id: &str) {
        self.record(Change::Ensure {
            category,
            id: id.to_owned(),
        });
    }

    /// Remove events of `category` not listed in `keep`. Returns the count.
    pub fn retain_events(&mut self, category: ProductCategory, keep: &[String]) -> usize {
        self.record(Change::Retain {
            category,
            keep: keep.to_vec(),
        })
    }

    /// Merge `contacts` into an event, creating the event if needed.
    /// Returns how many distinct contacts (by lowercased email) were merged.
    pub fn merge_contacts(
        &mut self,
        category: ProductCategory,
        id: &str,
        event_name: &str,
        title: &str,
        contacts: Vec<Contact>,
    ) -> usize {
        self.record(Change::Merge {
            category,
            id: id.to_owned(),
            event_name: event_name.to_owned(),
            title: title.to_owned(),
            contacts,
        })
    }

    /// Write pending changes. Under the store lock, the file is re-read and
    /// the changes are replayed onto it before the atomic `.tmp` + rename.
    pub fn save(&mut self) -> Result<(), SyncError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let Some(dir) = self.path.parent() else {
            return Err(io_err(
                &self.path,
                std::io::Error::other("invalid event store path"),
            ));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let guard = RunLock::wait_in(&self.lock_dir, STORE_LOCK_KEY, STORE_LOCK_TIMEOUT)?;
        let mut latest = read_store(&self.path)?;
        for change in &self.pending {
            change.apply(&mut latest);
        }
        latest.synced_at = Utc::now();

        let json = serde_json::to_string_pretty(&latest)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        guard.release()?;

        self.pending.clear();
        self.data = latest;
        Ok(())
    }

    fn record(&mut self, change: Change) -> usize {
        let count = change.apply(&mut self.data);
        self.pending.push(change);
        count
    }
}

fn read_store(path: &Path) -> Result<EventStoreFile, SyncError> {
    if !path.exists() {
        return Ok(EventStoreFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// SyncModel over the store
// ---------------------------------------------------------------------------

/// [`SyncModel`] that persists into an [`EventStore`] and pulls registrants
/// from the remote API.
///
/// The store is opened on first use, which under [`crate::pipeline::run`]
/// is after the run lock is held.
pub struct StoreModel<'a> {
    api: &'a dyn RemoteApi,
    home: PathBuf,
    store: Option<EventStore>,
}

impl<'a> StoreModel<'a> {
    pub fn new(api: &'a dyn RemoteApi, home: &Path) -> Self {
        Self {
            api,
            home: home.to_path_buf(),
            store: None,
        }
    }

    fn store_mut(&mut self) -> Result<&mut EventStore, SyncError> {
        let store = match self.store.take() {
            Some(store) => store,
            None => EventStore::open_at(&self.home)?,
        };
        Ok(self.store.insert(store))
    }
}

impl SyncModel for StoreModel<'_> {
    fn sync_product(
        &mut self,
        category: ProductCategory,
        id: &str,
        choice: &ProductChoice,
        _sink: &mut dyn ProgressSink,
    ) -> Result<(), SyncError> {
        let store = self.store_mut()?;
        match choice.description() {
            Some(title) => store.upsert_event(category, id, title),
            None => store.ensure_event(category, id),
        }
        store.save()
    }

    fn delete_removed_products(
        &mut self,
        category: ProductCategory,
        ids: &[String],
    ) -> Result<usize, SyncError> {
        let store = self.store_mut()?;
        let removed = store.retain_events(category, ids);
        if removed > 0 {
            tracing::info!("removed {removed} GoTo{} events no longer upstream", category.label());
            store.save()?;
        }
        Ok(removed)
    }

    fn sync_event(
        &mut self,
        category: ProductCategory,
        id: &str,
        event_name: &str,
        event_description: &str,
        _sink: &mut dyn ProgressSink,
    ) -> Result<usize, SyncError> {
        let contacts = self.api.fetch_registrants(category, id)?;
        let store = self.store_mut()?;
        let merged = store.merge_contacts(category, id, event_name, event_description, contacts);
        store.save()?;
        tracing::debug!("GoTo{} {id}: {merged} contacts", category.label());
        Ok(merged)
    }
}
