//! Request options consumed by [`SeqHTTPHandler`](super::SeqHTTPHandler).
//!
//! `HTTPHandlerBuilder` assembles these before handing them to the handler;
//! they stay mutable through the handler's accessors afterwards.

use std::collections::HashMap;
use std::time::Duration;

/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a whole request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default HTTP method.
pub const DEFAULT_METHOD: &str = "POST";
/// Default protocol version.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";
/// Header carrying the body's media type.
pub const CONTENT_TYPE: &str = "Content-Type";

/// How and where batches are sent.
///
/// A missing or empty `uri` disables delivery without removing the handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryOptions {
    uri: Option<String>,
    method: String,
    headers: HashMap<String, String>,
    protocol_version: String,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            uri: None,
            method: DEFAULT_METHOD.to_owned(),
            headers: HashMap::from([(CONTENT_TYPE.to_owned(), "application/json".to_owned())]),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_owned(),
        }
    }
}

impl DeliveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options targeting `uri` with every other value at its default.
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Set or clear the endpoint. `None` disables delivery.
    pub fn set_uri(&mut self, uri: Option<String>) -> &mut Self {
        self.uri = uri;
        self
    }

    /// Whether a non-blank endpoint is configured.
    pub fn is_enabled(&self) -> bool {
        self.uri.as_deref().is_some_and(|uri| !uri.trim().is_empty())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = method.into();
        self
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Replace every header.
    pub fn set_headers(&mut self, headers: HashMap<String, String>) -> &mut Self {
        self.headers = headers;
        self
    }

    /// Look up a header by exact name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Look up a header, falling back to `default`.
    pub fn header_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.header(key).unwrap_or(default)
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Add or replace a single header.
    pub fn push_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Remove a header, returning its value.
    pub fn pop_header(&mut self, key: &str) -> Option<String> {
        self.headers.remove(key)
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn set_protocol_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.protocol_version = version.into();
        self
    }

    /// Overlay `other` onto these options.
    ///
    /// The endpoint is only replaced when `other` sets one; headers are
    /// replaced wholesale, like every other value.
    pub fn merge(&mut self, other: DeliveryOptions) -> &mut Self {
        if other.uri.is_some() {
            self.uri = other.uri;
        }
        self.method = other.method;
        self.headers = other.headers;
        self.protocol_version = other.protocol_version;
        self
    }
}
