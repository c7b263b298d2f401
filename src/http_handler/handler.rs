//! Public handler type exported by the crate.

use std::any::Any;
use std::sync::Arc;

use crate::{
    formatter::{NormalizeError, SharedFormatter},
    handler::{HandlerError, SeqHandlerTrait},
    level,
    log_record::RawLogRecord,
};

use super::{
    config::DeliveryOptions,
    diagnostics::{DiagnosticSink, LogDiagnostics},
    transport::{DeliveryRequest, Transport, UreqTransport},
};

/// Status Seq answers with when a batch was ingested.
pub const INGESTION_SUCCESS_STATUS: u16 = 201;

/// How a single delivery attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered 201.
    Delivered,
    /// No endpoint is configured; nothing was sent.
    Suppressed,
    /// Any other status or a transport error. Already reported.
    Failed,
}

/// Handler sending batches of normalized records to a Seq endpoint.
///
/// Delivery is synchronous and fail-open: failures end up as one line on
/// the diagnostic sink and never reach the caller. Only structural
/// normalization errors are returned.
///
/// The options are not internally synchronized. Mutating them requires
/// `&mut self`, so hosts sharing a handler across threads must configure it
/// before sharing or wrap it in their own lock.
pub struct SeqHTTPHandler {
    options: DeliveryOptions,
    formatter: SharedFormatter,
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn DiagnosticSink>,
    min_level: i64,
    bubble: bool,
}

impl SeqHTTPHandler {
    /// Handler with the default formatter, transport and diagnostics.
    ///
    /// Handles every level and lets records bubble.
    pub fn new(options: DeliveryOptions) -> Self {
        Self {
            options,
            formatter: SharedFormatter::default(),
            transport: Arc::new(UreqTransport::default()),
            diagnostics: Arc::new(LogDiagnostics),
            min_level: level::DEBUG,
            bubble: true,
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Minimum numeric level a record needs to be handled.
    #[must_use]
    pub fn with_min_level(mut self, min_level: i64) -> Self {
        self.min_level = min_level;
        self
    }

    #[must_use]
    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DeliveryOptions {
        &mut self.options
    }

    /// Overlay `options` onto the current ones.
    pub fn set_options(&mut self, options: DeliveryOptions) -> &mut Self {
        self.options.merge(options);
        self
    }

    pub fn uri(&self) -> Option<&str> {
        self.options.uri()
    }

    pub fn set_uri(&mut self, uri: Option<String>) -> &mut Self {
        self.options.set_uri(uri);
        self
    }

    pub fn method(&self) -> &str {
        self.options.method()
    }

    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.options.set_method(method);
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.options.header(key)
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.options.has_header(key)
    }

    pub fn push_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.push_header(key, value);
        self
    }

    pub fn pop_header(&mut self, key: &str) -> Option<String> {
        self.options.pop_header(key)
    }

    pub fn protocol_version(&self) -> &str {
        self.options.protocol_version()
    }

    pub fn set_protocol_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.options.set_protocol_version(version);
        self
    }

    pub fn formatter(&self) -> &SharedFormatter {
        &self.formatter
    }

    pub fn set_formatter(&mut self, formatter: SharedFormatter) -> &mut Self {
        self.formatter = formatter;
        self
    }

    pub fn min_level(&self) -> i64 {
        self.min_level
    }

    pub fn bubble(&self) -> bool {
        self.bubble
    }

    /// Whether `record` reaches the minimum level.
    ///
    /// Records without a numeric level are never handled.
    pub fn is_handling(&self, record: &RawLogRecord) -> bool {
        record.level().is_some_and(|level| level >= self.min_level)
    }

    /// Handle one record as a batch of one.
    ///
    /// Returns `Ok(false)` for records below the minimum level, otherwise
    /// whether propagation should stop.
    pub fn handle(&self, record: RawLogRecord) -> Result<bool, NormalizeError> {
        if !self.is_handling(&record) {
            return Ok(false);
        }
        self.handle_batch(vec![record])?;
        Ok(!self.bubble)
    }

    /// Filter, format and deliver `records` in one request.
    ///
    /// # Errors
    ///
    /// Only normalization errors are returned; delivery failures are
    /// reported to the diagnostic sink.
    pub fn handle_batch(&self, records: Vec<RawLogRecord>) -> Result<(), NormalizeError> {
        self.send_batch(records).map(|_| ())
    }

    /// Like [`handle_batch`](Self::handle_batch), exposing the outcome.
    ///
    /// Returns `None` when no record passed the level gate and nothing was
    /// sent.
    pub fn send_batch(
        &self,
        records: Vec<RawLogRecord>,
    ) -> Result<Option<DeliveryOutcome>, NormalizeError> {
        let Some(body) = self.prepare_batch(records)? else {
            return Ok(None);
        };
        Ok(Some(self.deliver(body)))
    }

    /// Filter and format `records` without sending them.
    pub fn prepare_batch(
        &self,
        records: Vec<RawLogRecord>,
    ) -> Result<Option<String>, NormalizeError> {
        let handled: Vec<RawLogRecord> = records
            .into_iter()
            .filter(|record| self.is_handling(record))
            .collect();
        if handled.is_empty() {
            return Ok(None);
        }
        self.formatter.format_batch(handled).map(Some)
    }

    /// Send an already-formatted body.
    pub fn deliver(&self, body: String) -> DeliveryOutcome {
        let Some(uri) = self.options.uri().filter(|_| self.options.is_enabled()) else {
            log::debug!("SeqHTTPHandler has no endpoint; batch suppressed");
            return DeliveryOutcome::Suppressed;
        };

        let request = self.build_request(uri, body);
        match self.transport.send(&request) {
            Ok(response) if response.status == INGESTION_SUCCESS_STATUS => {
                DeliveryOutcome::Delivered
            }
            Ok(response) => {
                if response.body.trim().is_empty() {
                    self.diagnostics
                        .report(&format!("HTTP {}", response.status));
                } else {
                    self.diagnostics.report(&response.body);
                }
                DeliveryOutcome::Failed
            }
            Err(err) => {
                self.diagnostics.report(&err.to_string());
                DeliveryOutcome::Failed
            }
        }
    }

    fn build_request(&self, uri: &str, body: String) -> DeliveryRequest {
        let mut headers: Vec<(String, String)> = self
            .options
            .headers()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        headers.sort();
        DeliveryRequest {
            method: self.options.method().to_owned(),
            uri: uri.to_owned(),
            headers,
            body,
            protocol_version: self.options.protocol_version().to_owned(),
        }
    }
}

impl SeqHandlerTrait for SeqHTTPHandler {
    fn is_handling(&self, record: &RawLogRecord) -> bool {
        SeqHTTPHandler::is_handling(self, record)
    }

    fn handle(&self, record: RawLogRecord) -> Result<bool, HandlerError> {
        Ok(SeqHTTPHandler::handle(self, record)?)
    }

    fn handle_batch(&self, records: Vec<RawLogRecord>) -> Result<(), HandlerError> {
        Ok(SeqHTTPHandler::handle_batch(self, records)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for SeqHTTPHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqHTTPHandler")
            .field("options", &self.options)
            .field("formatter", &self.formatter)
            .field("min_level", &self.min_level)
            .field("bubble", &self.bubble)
            .finish()
    }
}
