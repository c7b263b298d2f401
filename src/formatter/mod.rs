//! Record normalization and wire encoding.
//!
//! [`SeqFormatter`] turns [`RawLogRecord`]s into [`NormalizedEnvelope`]s and
//! encodes batches of them for delivery. Handlers hold formatters through
//! [`SharedFormatter`] so one instance can serve several sinks and threads.

use std::{fmt, sync::Arc};

use serde_json::Value;
use thiserror::Error;

use crate::log_record::{FieldValue, RawLogRecord};

pub mod envelope;
pub mod exception;
pub mod processors;
pub mod value;

pub use envelope::{NormalizedEnvelope, SOURCE_CONTEXT};
pub use exception::{DEFAULT_MAX_DEPTH, ExceptionSerializer};
pub use processors::{Processor, ProcessorRegistry, format_timestamp, to_pascal_case};
pub use value::{DEFAULT_MAX_ITEM_COUNT, NormalizeLimits};

/// Structural errors raised while normalizing records.
///
/// These indicate a contract violation between the record producer and the
/// formatter and are meant to surface loudly.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The record was not an object.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A record key has no registered processor.
    #[error("Wrong code path! No processor registered for field `{field}` (from key `{key}`)")]
    WrongCodePath { key: String, field: String },
    /// A known field held a value of the wrong kind.
    #[error("field `{field}` expected {expected}, found {found}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Encoding the normalized envelopes failed.
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// How a batch of envelopes is laid out in the request body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// A single JSON array.
    #[default]
    JsonArray,
    /// One JSON object per line (CLEF).
    NewlineDelimited,
}

impl BatchMode {
    /// Content type matching the body layout.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::JsonArray => "application/json",
            Self::NewlineDelimited => "application/vnd.serilog.clef",
        }
    }
}

impl std::str::FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "array" | "json_array" => Ok(Self::JsonArray),
            "newlines" | "newline" | "clef" | "ndjson" => Ok(Self::NewlineDelimited),
            other => Err(format!("unknown batch mode: {other}")),
        }
    }
}

/// Trait for turning raw records into request bodies.
///
/// Implementors must be thread-safe (`Send + Sync`) so a formatter can be
/// shared between a handler and its background worker.
pub trait RecordFormatter: Send + Sync {
    /// Format one record.
    fn format(&self, record: RawLogRecord) -> Result<String, NormalizeError>;

    /// Format a batch into one body, preserving order.
    fn format_batch(&self, records: Vec<RawLogRecord>) -> Result<String, NormalizeError>;

    /// Content type of the bodies produced by [`format_batch`](Self::format_batch).
    fn content_type(&self) -> &'static str;
}

/// Shared formatter trait object used across handlers.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn RecordFormatter>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: RecordFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    pub fn format(&self, record: RawLogRecord) -> Result<String, NormalizeError> {
        self.inner.format(record)
    }

    pub fn format_batch(&self, records: Vec<RawLogRecord>) -> Result<String, NormalizeError> {
        self.inner.format_batch(records)
    }

    pub fn content_type(&self) -> &'static str {
        self.inner.content_type()
    }
}

impl Default for SharedFormatter {
    fn default() -> Self {
        Self::new(SeqFormatter::default())
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn RecordFormatter>)")
    }
}

/// Normalizes raw records into Seq envelopes.
#[derive(Clone, Debug)]
pub struct SeqFormatter {
    registry: ProcessorRegistry,
    limits: NormalizeLimits,
    batch_mode: BatchMode,
}

impl Default for SeqFormatter {
    fn default() -> Self {
        Self::new(BatchMode::default())
    }
}

impl SeqFormatter {
    /// Formatter with the standard processors and default limits.
    pub fn new(batch_mode: BatchMode) -> Self {
        Self {
            registry: ProcessorRegistry::standard(),
            limits: NormalizeLimits::default(),
            batch_mode,
        }
    }

    /// Override the recursion limit for properties and exception chains.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    /// Override the per-collection item limit.
    #[must_use]
    pub fn with_max_item_count(mut self, max_item_count: usize) -> Self {
        self.limits.max_item_count = max_item_count;
        self
    }

    /// Register an additional processor for canonical field `field`.
    #[must_use]
    pub fn with_processor<F>(mut self, field: impl Into<String>, processor: F) -> Self
    where
        F: Fn(&mut NormalizedEnvelope, FieldValue, &NormalizeLimits) -> Result<(), NormalizeError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(field, processor);
        self
    }

    pub fn batch_mode(&self) -> BatchMode {
        self.batch_mode
    }

    pub fn limits(&self) -> NormalizeLimits {
        self.limits
    }

    /// Normalize one record.
    ///
    /// Every key is routed to its processor in record order, so the output
    /// key set depends only on the input key set.
    ///
    /// # Errors
    ///
    /// Fails on unknown keys and on fields holding values of the wrong kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqlog::{RawLogRecord, SeqFormatter, SeqLevel};
    ///
    /// let record = RawLogRecord::new("app", 300, "careful");
    /// let envelope = SeqFormatter::default().normalize(record).unwrap();
    /// assert_eq!(envelope.level, Some(SeqLevel::Warning));
    /// assert_eq!(envelope.message_template.as_deref(), Some("careful"));
    /// ```
    pub fn normalize(&self, record: RawLogRecord) -> Result<NormalizedEnvelope, NormalizeError> {
        let mut envelope = NormalizedEnvelope::default();
        for (key, value) in record {
            self.registry
                .dispatch(&key, &mut envelope, value, &self.limits)?;
        }
        Ok(envelope)
    }

    /// Normalize a loosely-typed JSON record.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidInput`] for anything but an object,
    /// plus the errors of [`normalize`](Self::normalize).
    pub fn normalize_json(&self, value: Value) -> Result<NormalizedEnvelope, NormalizeError> {
        self.normalize(RawLogRecord::try_from(value)?)
    }

    /// Normalize records in order, stopping at the first failure.
    pub fn normalize_batch<I>(&self, records: I) -> Result<Vec<NormalizedEnvelope>, NormalizeError>
    where
        I: IntoIterator<Item = RawLogRecord>,
    {
        records
            .into_iter()
            .map(|record| self.normalize(record))
            .collect()
    }

    /// Encode already-normalized envelopes using the configured batch mode.
    pub fn encode_batch(&self, envelopes: &[NormalizedEnvelope]) -> Result<String, NormalizeError> {
        match self.batch_mode {
            BatchMode::JsonArray => Ok(serde_json::to_string(envelopes)?),
            BatchMode::NewlineDelimited => {
                let lines = envelopes
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(lines.join("\n"))
            }
        }
    }
}

impl RecordFormatter for SeqFormatter {
    fn format(&self, record: RawLogRecord) -> Result<String, NormalizeError> {
        let envelope = self.normalize(record)?;
        Ok(serde_json::to_string(&envelope)?)
    }

    fn format_batch(&self, records: Vec<RawLogRecord>) -> Result<String, NormalizeError> {
        let envelopes = self.normalize_batch(records)?;
        self.encode_batch(&envelopes)
    }

    fn content_type(&self) -> &'static str {
        self.batch_mode.content_type()
    }
}
