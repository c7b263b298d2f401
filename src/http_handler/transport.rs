//! Outbound HTTP transport.
//!
//! The handler only needs to send one request and read back a status and
//! body. [`UreqTransport`] does that with a pooled `ureq::Agent`; tests
//! substitute their own [`Transport`].

use std::io;
use std::time::Duration;

use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use super::config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PROTOCOL_VERSION, DEFAULT_REQUEST_TIMEOUT};

/// One fully-assembled request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub method: String,
    pub uri: String,
    /// Headers sorted by name so requests are reproducible.
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub protocol_version: String,
}

impl DeliveryRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What came back from the endpoint, whatever the status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Io(#[from] io::Error),
}

/// Sends a single request.
pub trait Transport: Send + Sync {
    fn send(&self, request: &DeliveryRequest) -> Result<TransportResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Clone, Debug)]
pub struct UreqTransport {
    agent: Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }
}

impl UreqTransport {
    /// Build an agent with the given connect and overall request timeouts.
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(timeout)
            .build();
        Self { agent }
    }

    fn read_response(response: ureq::Response) -> Result<TransportResponse, TransportError> {
        let status = response.status();
        let body = response.into_string()?;
        Ok(TransportResponse { status, body })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &DeliveryRequest) -> Result<TransportResponse, TransportError> {
        // ureq 2 always speaks HTTP/1.1.
        if request.protocol_version != DEFAULT_PROTOCOL_VERSION {
            log::debug!(
                "UreqTransport ignores protocol version {}",
                request.protocol_version
            );
        }

        let mut req = self.agent.request(&request.method, &request.uri);
        for (key, value) in &request.headers {
            req = req.set(key, value);
        }

        match req.send_string(&request.body) {
            Ok(response) => Self::read_response(response),
            // Non-2xx statuses are still responses here.
            Err(ureq::Error::Status(_, response)) => Self::read_response(response),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Transport(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let request = DeliveryRequest {
            method: "POST".into(),
            uri: "http://localhost/".into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: String::new(),
            protocol_version: "1.1".into(),
        };
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let transport =
            UreqTransport::new(Duration::from_millis(500), Duration::from_millis(500));
        let request = DeliveryRequest {
            method: "POST".into(),
            uri: format!("http://{addr}/api/events/raw"),
            headers: Vec::new(),
            body: "[]".into(),
            protocol_version: "1.1".into(),
        };
        let err = transport.send(&request).expect_err("nothing listening");
        assert!(matches!(err, TransportError::Transport(_)));
    }
}
