//! # gotosync-client
//!
//! Blocking HTTP client for the GoTo REST API.
//!
//! Every outbound call is an [`OutboundRequest`] tagged with its
//! [`RequestKind`]. Before the [`Transport`] sends it, the request passes
//! through the client's [`RequestHook`] chain; [`RequestAuthorizer`] is the
//! hook that turns client credentials into a Basic `Authorization` header
//! on token-issuance requests.

pub mod api;
pub mod authorizer;
pub mod error;
pub mod request;
pub mod transport;

pub use api::{AccessToken, ApiClient};
pub use authorizer::{get_authorization, RequestAuthorizer};
pub use error::ClientError;
pub use request::{Method, OutboundRequest, RequestHook, RequestKind};
pub use transport::{Transport, TransportResponse, UreqTransport};
