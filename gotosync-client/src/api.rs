//! GoTo REST API client.
//!
//! ## Endpoints (relative to `api.base_url`)
//!
//! | purpose | path | id field |
//! |---|---|---|
//! | token | `oauth/v2/token` | |
//! | webinar catalog | `G2W/rest/v2/organizers/{organizer}/upcomingWebinars` | `webinarKey` |
//! | meeting catalog | `G2M/rest/upcomingMeetings` | `meetingId` |
//! | training catalog | `G2T/rest/organizers/{organizer}/trainings` | `trainingKey` |
//! | assist catalog | `G2A/rest/v1/sessions` | `sessionId` |
//!
//! Registrants live under `<catalog>/{id}/registrants` for webinars and
//! trainings and `<catalog>/{id}/attendees` for meetings and assist sessions.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;

use gotosync_core::{
    ApiConfig, Config, Contact, CoreError, Credentials, ProductCategory, ProductChoice,
    ProductChoices, RemoteApi,
};

use crate::authorizer::RequestAuthorizer;
use crate::error::ClientError;
use crate::request::{OutboundRequest, RequestHook, RequestKind};
use crate::transport::{Transport, UreqTransport};

pub const TOKEN_PATH: &str = "oauth/v2/token";

/// Tokens are refreshed this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
/// Upper bound on an advertised `expires_in`.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// A bearer token plus the organizer the token exchange returned.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
    pub organizer_key: Option<String>,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    organizer_key: Option<Value>,
}

pub struct ApiClient {
    api: ApiConfig,
    credentials: Credentials,
    products: Option<Vec<ProductCategory>>,
    transport: Box<dyn Transport>,
    hooks: Vec<Box<dyn RequestHook>>,
    token: Mutex<Option<AccessToken>>,
}

impl ApiClient {
    /// Client over the default `ureq` transport.
    pub fn new(config: &Config) -> Self {
        let transport = UreqTransport::new(Duration::from_secs(config.api.timeout_secs));
        Self::with_transport(config, Box::new(transport))
    }

    /// Client over an arbitrary transport. [`RequestAuthorizer`] is always
    /// registered as the first hook.
    pub fn with_transport(config: &Config, transport: Box<dyn Transport>) -> Self {
        Self {
            api: config.api.clone(),
            credentials: config.credentials.clone(),
            products: config.products.clone(),
            transport,
            hooks: vec![Box::new(RequestAuthorizer::new())],
            token: Mutex::new(None),
        }
    }

    /// Append a hook to the pre-send chain.
    pub fn register_hook(&mut self, hook: Box<dyn RequestHook>) {
        self.hooks.push(hook);
    }

    pub fn token_url(&self) -> String {
        self.url(TOKEN_PATH)
    }

    /// Current access token, exchanging credentials if none is cached or the
    /// cached one is about to expire.
    pub fn access_token(&self) -> Result<AccessToken, ClientError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.clone());
        }

        let token = self.exchange_token()?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Run `request` through the hook chain, send it, and return the body of
    /// a successful response.
    pub fn execute(&self, mut request: OutboundRequest) -> Result<String, ClientError> {
        for hook in &self.hooks {
            hook.before_send(&mut request)?;
        }
        tracing::debug!("{:?} {:?} {}", request.kind, request.method, request.url);

        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(ClientError::Http {
                status: response.status,
                url: request.url,
            });
        }
        Ok(response.body)
    }

    fn exchange_token(&self) -> Result<AccessToken, ClientError> {
        let request = OutboundRequest::token(self.token_url(), &self.credentials);
        let body = self.execute(request)?;
        let parsed: TokenResponse = serde_json::from_str(&body)?;
        if parsed.access_token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "token response has an empty access_token".into(),
            ));
        }

        let lifetime = parsed
            .expires_in
            .map(|secs| Duration::from_secs(secs).min(MAX_TOKEN_LIFETIME))
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let now = Instant::now();
        let expires_at = now.checked_add(lifetime).ok_or_else(|| {
            ClientError::InvalidResponse(format!(
                "token lifetime of {}s is out of range",
                lifetime.as_secs()
            ))
        })?;
        tracing::info!("obtained access token valid for {}s", lifetime.as_secs());
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at,
            organizer_key: parsed.organizer_key.as_ref().and_then(value_to_id),
        })
    }

    fn get_json(&self, kind: RequestKind, url: String) -> Result<Value, ClientError> {
        let token = self.access_token()?;
        let request = OutboundRequest::get(kind, url)
            .with_header("Authorization", format!("Bearer {}", token.value))
            .with_header("Accept", "application/json");
        let body = self.execute(request)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn catalog_url(&self, category: ProductCategory) -> Result<String, ClientError> {
        let path = match category {
            ProductCategory::Webinar => format!(
                "G2W/rest/v2/organizers/{}/upcomingWebinars",
                self.organizer_key()?
            ),
            ProductCategory::Meeting => "G2M/rest/upcomingMeetings".to_owned(),
            ProductCategory::Training => {
                format!("G2T/rest/organizers/{}/trainings", self.organizer_key()?)
            }
            ProductCategory::Assist => "G2A/rest/v1/sessions".to_owned(),
        };
        Ok(self.url(&path))
    }

    fn registrants_url(&self, category: ProductCategory, id: &str) -> Result<String, ClientError> {
        let leaf = match category {
            ProductCategory::Webinar | ProductCategory::Training => "registrants",
            ProductCategory::Meeting | ProductCategory::Assist => "attendees",
        };
        Ok(format!(
            "{}/{}/{leaf}",
            self.catalog_url(category)?,
            path_segment(id)?
        ))
    }

    fn organizer_key(&self) -> Result<String, ClientError> {
        if let Some(key) = self.api.organizer_key.as_ref().filter(|k| !k.is_empty()) {
            return path_segment(key);
        }
        let key = self.access_token()?.organizer_key.ok_or_else(|| {
            ClientError::InvalidResponse(
                "no organizer key configured and none returned by the token exchange".into(),
            )
        })?;
        path_segment(&key)
    }

    fn enabled(&self, category: ProductCategory) -> bool {
        self.products
            .as_ref()
            .map(|p| p.contains(&category))
            .unwrap_or(true)
    }

    fn ensure_enabled(&self, category: ProductCategory) -> Result<(), CoreError> {
        if self.enabled(category) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(category))
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api.base_url.trim_end_matches('/'), path)
    }
}

impl RemoteApi for ApiClient {
    fn is_authorized(&self, category: ProductCategory) -> bool {
        if !self.enabled(category) {
            tracing::debug!("GoTo{} is not enabled", category.label());
            return false;
        }
        match self.access_token() {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("GoTo{} not authorized: {err}", category.label());
                false
            }
        }
    }

    fn fetch_choices(&self, category: ProductCategory) -> Result<ProductChoices, CoreError> {
        self.ensure_enabled(category)?;
        let url = self.catalog_url(category)?;
        let payload = self.get_json(RequestKind::Catalog, url)?;
        Ok(parse_choices(category, &payload)?)
    }

    fn fetch_registrants(
        &self,
        category: ProductCategory,
        id: &str,
    ) -> Result<Vec<Contact>, CoreError> {
        self.ensure_enabled(category)?;
        let url = self.registrants_url(category, id)?;
        let payload = self.get_json(RequestKind::Registrants, url)?;
        Ok(parse_contacts(&payload)?)
    }
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

/// Remote id field of catalog items for `category`.
pub fn id_field(category: ProductCategory) -> &'static str {
    match category {
        ProductCategory::Webinar => "webinarKey",
        ProductCategory::Meeting => "meetingId",
        ProductCategory::Training => "trainingKey",
        ProductCategory::Assist => "sessionId",
    }
}

/// Catalog payload → ordered choices. Items without an id are skipped.
pub fn parse_choices(
    category: ProductCategory,
    payload: &Value,
) -> Result<ProductChoices, ClientError> {
    let field = id_field(category);
    let mut choices = ProductChoices::new();
    for item in items(payload)? {
        let Some(object) = item.as_object() else {
            continue;
        };
        match object.get(field).and_then(value_to_id) {
            Some(id) => choices.insert(id, ProductChoice::from(object.clone())),
            None => tracing::warn!("skipping GoTo{} item without {field}", category.label()),
        }
    }
    Ok(choices)
}

/// Registrant payload → contacts. Entries without an email are skipped.
pub fn parse_contacts(payload: &Value) -> Result<Vec<Contact>, ClientError> {
    let mut contacts = Vec::new();
    for item in items(payload)? {
        let Some(email) = item
            .get("email")
            .or_else(|| item.get("attendeeEmail"))
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        else {
            continue;
        };
        let text = |field: &str| {
            item.get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        contacts.push(Contact {
            email: email.to_owned(),
            first_name: text("firstName"),
            last_name: text("lastName"),
            status: text("status"),
        });
    }
    Ok(contacts)
}

/// The list of items in a payload: either the payload itself, or the first
/// array nested one level down (`{"_embedded": {"webinars": [...]}}` or
/// `{"sessions": [...]}`).
fn items(payload: &Value) -> Result<&Vec<Value>, ClientError> {
    if let Some(list) = payload.as_array() {
        return Ok(list);
    }
    let nested = payload.as_object().and_then(|object| {
        object.values().find_map(|v| {
            v.as_array().or_else(|| {
                v.as_object()
                    .and_then(|inner| inner.values().find_map(Value::as_array))
            })
        })
    });
    nested.ok_or_else(|| ClientError::InvalidResponse("expected a JSON list of items".into()))
}

/// Percent-encode one URL path segment. Dot segments and empty values are
/// refused since they would change the path.
pub fn path_segment(value: &str) -> Result<String, ClientError> {
    if matches!(value, "" | "." | "..") {
        return Err(ClientError::InvalidPathSegment(value.to_owned()));
    }
    Ok(urlencoding::encode(value).into_owned())
}

/// Remote ids arrive as strings or (large) integers.
fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
