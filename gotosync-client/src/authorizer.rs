//! Basic-auth injection for OAuth2 token requests.
//!
//! The token endpoint expects the client credentials as
//! `Authorization: Basic base64(client_id:client_secret)` together with a
//! form-encoded body. [`RequestAuthorizer`] reads the credentials from the
//! request's own parameters, so whoever builds the token request only has to
//! fill in `client_id` and `client_secret`.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ClientError;
use crate::request::{OutboundRequest, RequestHook, RequestKind};

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Pre-send hook for [`RequestKind::TokenIssuance`] requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAuthorizer;

impl RequestAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

impl RequestHook for RequestAuthorizer {
    fn before_send(&self, request: &mut OutboundRequest) -> Result<(), ClientError> {
        if request.kind != RequestKind::TokenIssuance {
            return Ok(());
        }

        // Compute first: a rejected request keeps its headers untouched.
        let authorization = get_authorization(&request.params)?;
        request.headers.clear();
        request
            .headers
            .insert(AUTHORIZATION.to_owned(), authorization);
        request
            .headers
            .insert(CONTENT_TYPE.to_owned(), FORM_URLENCODED.to_owned());
        tracing::debug!("authorized token request to {}", request.url);
        Ok(())
    }
}

/// Build the `Authorization` header value from `client_id` / `client_secret`
/// parameters.
///
/// Standard base64 alphabet with padding.
pub fn get_authorization(params: &BTreeMap<String, String>) -> Result<String, ClientError> {
    let client_id = params
        .get("client_id")
        .filter(|v| !v.is_empty())
        .ok_or(ClientError::MissingClientId)?;
    let client_secret = params
        .get("client_secret")
        .filter(|v| !v.is_empty())
        .ok_or(ClientError::MissingClientSecret)?;

    let raw = format!("{client_id}:{client_secret}");
    Ok(format!("Basic {}", STANDARD.encode(raw)))
}
