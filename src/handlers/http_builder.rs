//! Builder for [`SeqHTTPHandler`] and [`BackgroundHandler`].
//!
//! Exposes the endpoint, request options, authentication, level gate, batch
//! mode, normalization limits and timeouts. The same settings can be read
//! from an INI section:
//!
//! ```ini
//! [seq]
//! uri = http://localhost:5341/api/events/raw
//! method = POST
//! min_level = warning
//! batch_mode = newlines
//! api_key = abc123
//! header.X-Environment = staging
//! ```

use std::{collections::HashMap, fs, path::Path, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use ini::{Ini, Properties};

use crate::{
    formatter::{BatchMode, SeqFormatter, SharedFormatter},
    http_handler::{
        BackgroundConfig, BackgroundHandler, CONTENT_TYPE, DEFAULT_CONNECT_TIMEOUT,
        DEFAULT_REQUEST_TIMEOUT, DeliveryOptions, SeqHTTPHandler, UreqTransport,
    },
    level,
};

use super::{HandlerBuildError, HandlerBuilderTrait, ensure_positive};

/// Header Seq reads API keys from.
pub const API_KEY_HEADER: &str = "X-Seq-ApiKey";
/// INI key prefix for arbitrary request headers.
const HEADER_PREFIX: &str = "header.";

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`SeqHTTPHandler`] instances.
#[derive(Clone, Debug, Default)]
pub struct HTTPHandlerBuilder {
    uri: Option<String>,
    method: Option<String>,
    headers: HashMap<String, String>,
    protocol_version: Option<String>,
    min_level: Option<i64>,
    bubble: Option<bool>,
    batch_mode: BatchMode,
    max_depth: Option<usize>,
    max_item_count: Option<usize>,
    connect_timeout_ms: Option<u64>,
    timeout_ms: Option<u64>,
    capacity: Option<usize>,
    flush_timeout_ms: Option<u64>,
}

impl HTTPHandlerBuilder {
    /// Create a new builder with no endpoint configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ingestion endpoint. Without one the handler suppresses
    /// every delivery.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the HTTP method. Defaults to POST.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Replace all custom headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single custom header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Authenticate with a Seq API key.
    pub fn with_api_key(self, key: impl Into<String>) -> Self {
        self.with_header(API_KEY_HEADER, key)
    }

    /// Configure HTTP Basic authentication.
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
        self.with_header("Authorization", format!("Basic {encoded}"))
    }

    /// Configure Bearer token authentication.
    pub fn with_bearer_token(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    /// Choose how batches are encoded. Also picks the default content type.
    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    option_setter!(
        #[doc = "Set the minimum numeric level a record needs to be sent."]
        with_min_level,
        min_level,
        i64
    );
    option_setter!(
        #[doc = "Whether handled records bubble to further handlers."]
        with_bubble,
        bubble,
        bool
    );
    option_setter!(
        #[doc = "Set the recursion limit for properties and exception chains."]
        with_max_depth,
        max_depth,
        usize
    );
    option_setter!(
        #[doc = "Set the per-collection item limit."]
        with_max_item_count,
        max_item_count,
        usize
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the overall request timeout in milliseconds."]
        with_timeout_ms,
        timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the background queue capacity, in batches."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(
        #[doc = "Set how long background flush and close wait, in milliseconds."]
        with_flush_timeout_ms,
        flush_timeout_ms,
        u64
    );

    /// Read settings from an INI section.
    ///
    /// Unknown keys are rejected so typos do not silently fall back to
    /// defaults.
    pub fn from_ini_section(section: &Properties) -> Result<Self, HandlerBuildError> {
        let mut builder = Self::new();
        for (key, value) in section.iter() {
            builder = builder.apply_ini_entry(key, value.trim())?;
        }
        Ok(builder)
    }

    /// Parse `text` and read settings from section `name`.
    pub fn from_ini_str(text: &str, name: &str) -> Result<Self, HandlerBuildError> {
        let ini = Ini::load_from_str(text)?;
        let section = ini
            .section(Some(name))
            .ok_or_else(|| HandlerBuildError::MissingSection(name.to_owned()))?;
        Self::from_ini_section(section)
    }

    /// Read settings from section `name` of the INI file at `path`.
    pub fn from_ini_file(path: impl AsRef<Path>, name: &str) -> Result<Self, HandlerBuildError> {
        let text = fs::read_to_string(path)?;
        Self::from_ini_str(&text, name)
    }

    fn apply_ini_entry(self, key: &str, value: &str) -> Result<Self, HandlerBuildError> {
        if let Some(header) = key.strip_prefix(HEADER_PREFIX) {
            return Ok(self.with_header(header, value));
        }
        let builder = match key {
            "uri" => self.with_uri(value),
            "method" => self.with_method(value),
            "protocol_version" => self.with_protocol_version(value),
            "api_key" => self.with_api_key(value),
            "min_level" => self.with_min_level(parse_level(value)?),
            "bubble" => self.with_bubble(parse_bool(key, value)?),
            "batch_mode" => self.with_batch_mode(
                value
                    .parse()
                    .map_err(HandlerBuildError::InvalidConfig)?,
            ),
            "max_depth" => self.with_max_depth(parse_number(key, value)?),
            "max_item_count" => self.with_max_item_count(parse_number(key, value)?),
            "connect_timeout_ms" => self.with_connect_timeout_ms(parse_number(key, value)?),
            "timeout_ms" => self.with_timeout_ms(parse_number(key, value)?),
            "capacity" => self.with_capacity(parse_number(key, value)?),
            "flush_timeout_ms" => self.with_flush_timeout_ms(parse_number(key, value)?),
            other => {
                return Err(HandlerBuildError::InvalidConfig(format!(
                    "unknown key `{other}`"
                )));
            }
        };
        Ok(builder)
    }

    fn validate(&self) -> Result<(), HandlerBuildError> {
        self.validate_method()?;
        self.validate_protocol_version()?;
        self.validate_limits()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_method(&self) -> Result<(), HandlerBuildError> {
        match self.method.as_deref() {
            Some(method) if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) => {
                Err(HandlerBuildError::InvalidConfig(format!(
                    "invalid HTTP method `{method}`"
                )))
            }
            _ => Ok(()),
        }
    }

    fn validate_protocol_version(&self) -> Result<(), HandlerBuildError> {
        match self.protocol_version.as_deref() {
            Some(version) if version.trim().is_empty() => Err(HandlerBuildError::InvalidConfig(
                "protocol_version must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_limits(&self) -> Result<(), HandlerBuildError> {
        if let Some(count) = self.max_item_count {
            ensure_positive!(count, "max_item_count")?;
        }
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), HandlerBuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.timeout_ms {
            ensure_positive!(timeout, "timeout_ms")?;
        }
        if let Some(timeout) = self.flush_timeout_ms {
            ensure_positive!(timeout, "flush_timeout_ms")?;
        }
        Ok(())
    }

    fn build_options(&self) -> DeliveryOptions {
        let mut options = DeliveryOptions::default();
        options.set_uri(self.uri.clone());
        if let Some(method) = &self.method {
            options.set_method(method.to_ascii_uppercase());
        }
        if let Some(version) = &self.protocol_version {
            options.set_protocol_version(version.trim());
        }
        options.push_header(CONTENT_TYPE, self.batch_mode.content_type());
        for (key, value) in &self.headers {
            options.push_header(key.clone(), value.clone());
        }
        options
    }

    fn build_formatter(&self) -> SharedFormatter {
        let mut formatter = SeqFormatter::new(self.batch_mode);
        if let Some(depth) = self.max_depth {
            formatter = formatter.with_max_depth(depth);
        }
        if let Some(count) = self.max_item_count {
            formatter = formatter.with_max_item_count(count);
        }
        SharedFormatter::new(formatter)
    }

    fn build_transport(&self) -> UreqTransport {
        UreqTransport::new(
            self.connect_timeout_ms
                .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_millis),
            self.timeout_ms
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis),
        )
    }

    /// Build a handler that delivers on a worker thread.
    pub fn build_background(&self) -> Result<BackgroundHandler, HandlerBuildError> {
        let handler = self.build_inner()?;
        let defaults = BackgroundConfig::default();
        let config = BackgroundConfig {
            capacity: self.capacity.unwrap_or(defaults.capacity),
            flush_timeout: self
                .flush_timeout_ms
                .map_or(defaults.flush_timeout, Duration::from_millis),
            warn_interval: defaults.warn_interval,
        };
        Ok(BackgroundHandler::with_config(handler, config))
    }
}

impl HandlerBuilderTrait for HTTPHandlerBuilder {
    type Handler = SeqHTTPHandler;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        self.validate()?;
        Ok(SeqHTTPHandler::new(self.build_options())
            .with_formatter(self.build_formatter())
            .with_transport(Arc::new(self.build_transport()))
            .with_min_level(self.min_level.unwrap_or(level::DEBUG))
            .with_bubble(self.bubble.unwrap_or(true)))
    }
}

/// Accepts a numeric code or a level name such as `warning`.
fn parse_level(value: &str) -> Result<i64, HandlerBuildError> {
    value
        .parse::<i64>()
        .ok()
        .or_else(|| level::code_for_name(value))
        .ok_or_else(|| HandlerBuildError::InvalidConfig(format!("unknown level `{value}`")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, HandlerBuildError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(HandlerBuildError::InvalidConfig(format!(
            "{key} expects a boolean, got `{value}`"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HandlerBuildError> {
    value.parse().map_err(|_| {
        HandlerBuildError::InvalidConfig(format!("{key} expects a number, got `{value}`"))
    })
}
