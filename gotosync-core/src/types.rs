//! Domain types for gotosync.
//!
//! Product categories form a closed set; everything the remote catalog says
//! about an item is kept as an untyped JSON map so that only the fields the
//! sync engine reads (`subject`, `name`) are interpreted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Product categories
// ---------------------------------------------------------------------------

/// One of the four remote product types.
///
/// Declaration order is significant: "all products" runs process categories
/// in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Webinar,
    Meeting,
    Training,
    Assist,
}

impl ProductCategory {
    /// Every category, in declaration order.
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::Webinar,
        ProductCategory::Meeting,
        ProductCategory::Training,
        ProductCategory::Assist,
    ];

    /// Canonical lowercase name, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Webinar => "webinar",
            ProductCategory::Meeting => "meeting",
            ProductCategory::Training => "training",
            ProductCategory::Assist => "assist",
        }
    }

    /// Capitalised name used in user-facing output (`GoTo<label>`).
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Webinar => "Webinar",
            ProductCategory::Meeting => "Meeting",
            ProductCategory::Training => "Training",
            ProductCategory::Assist => "Assist",
        }
    }

    /// Membership test for the closed set.
    pub fn is_valid(name: &str) -> bool {
        name.parse::<ProductCategory>().is_ok()
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CoreError::InvalidProduct(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Catalog choices
// ---------------------------------------------------------------------------

/// Descriptor of one schedulable remote item, as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductChoice(pub Map<String, Value>);

impl ProductChoice {
    /// Stand-in descriptor used when a single id is requested explicitly and
    /// the catalog is not fetched.
    pub fn placeholder(id: &str) -> Self {
        let mut map = Map::new();
        map.insert("id".to_owned(), Value::String(id.to_owned()));
        Self(map)
    }

    /// Human-readable title: `subject` if present, otherwise `name`.
    pub fn description(&self) -> Option<&str> {
        self.0
            .get("subject")
            .or_else(|| self.0.get("name"))
            .and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl From<Map<String, Value>> for ProductChoice {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Catalog of one category: remote id → descriptor, in catalog order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductChoices(Vec<(String, ProductChoice)>);

impl ProductChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// The working set for an explicitly requested id.
    pub fn singleton(id: &str) -> Self {
        Self(vec![(id.to_owned(), ProductChoice::placeholder(id))])
    }

    /// Append an entry. A repeated id replaces the earlier descriptor in place.
    pub fn insert(&mut self, id: impl Into<String>, choice: ProductChoice) {
        let id = id.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = choice,
            None => self.0.push((id, choice)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ProductChoice> {
        self.0
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, choice)| choice)
    }

    /// Remote ids in catalog order.
    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProductChoice)> {
        self.0.iter().map(|(id, choice)| (id.as_str(), choice))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ProductChoice)> for ProductChoices {
    fn from_iter<I: IntoIterator<Item = (String, ProductChoice)>>(iter: I) -> Self {
        let mut choices = ProductChoices::new();
        for (id, choice) in iter {
            choices.insert(id, choice);
        }
        choices
    }
}

// ---------------------------------------------------------------------------
// Credentials and contacts
// ---------------------------------------------------------------------------

/// OAuth2 client credentials for the token exchange.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Both halves present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A registrant or attendee of a remote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Contact {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            status: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
