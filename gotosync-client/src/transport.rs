//! Wire transport.
//!
//! [`Transport`] is the only place bytes leave the process. The default
//! implementation is a blocking `ureq` agent; tests substitute scripted
//! transports.

use std::time::Duration;

use crate::error::ClientError;
use crate::request::{Method, OutboundRequest};

/// Status and body of a completed HTTP exchange (any status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    /// Send `request` as-is. Non-2xx statuses are returned, not raised.
    fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, ClientError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("gotosync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, ClientError> {
        let mut call = match request.method {
            Method::Get => self.agent.get(&request.url),
            Method::Post => self.agent.post(&request.url),
        };
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match request.method {
            Method::Get => {
                for (key, value) in &request.params {
                    call = call.query(key, value);
                }
                call.call()
            }
            Method::Post => {
                let form: Vec<(&str, &str)> = request
                    .params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                call.send_form(&form)
            }
        };

        match result {
            Ok(response) => read_response(response),
            Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(err)) => Err(ClientError::Transport(err.to_string())),
        }
    }
}

fn read_response(response: ureq::Response) -> Result<TransportResponse, ClientError> {
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|e| ClientError::Transport(format!("reading response body: {e}")))?;
    Ok(TransportResponse { status, body })
}
