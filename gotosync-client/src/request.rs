//! Outbound request model and the pre-send hook seam.

use std::collections::BTreeMap;

use gotosync_core::Credentials;

use crate::error::ClientError;

/// What an outbound request is for. Set by whoever builds the request, so
/// hooks never have to guess from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// OAuth2 client-credentials exchange.
    TokenIssuance,
    /// Catalog listing for a product category.
    Catalog,
    /// Registrants / attendees of one item.
    Registrants,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request on its way out. Hooks may rewrite headers and parameters.
///
/// `params` are sent as the query string for `GET` and as a form body for
/// `POST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub kind: RequestKind,
    pub method: Method,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl OutboundRequest {
    pub fn get(kind: RequestKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            method: Method::Get,
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Client-credentials token request carrying `client_id` / `client_secret`
    /// as form parameters.
    pub fn token(url: impl Into<String>, credentials: &Credentials) -> Self {
        Self {
            kind: RequestKind::TokenIssuance,
            method: Method::Post,
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
        .with_param("grant_type", "client_credentials")
        .with_param("client_id", &credentials.client_id)
        .with_param("client_secret", &credentials.client_secret)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Invoked on every outbound request before it is sent.
///
/// Hooks run in registration order; the first error aborts the send.
pub trait RequestHook: Send + Sync {
    fn before_send(&self, request: &mut OutboundRequest) -> Result<(), ClientError>;
}
