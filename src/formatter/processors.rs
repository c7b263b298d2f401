//! Field processors keyed by canonical field name.
//!
//! Raw record keys use snake or kebab case (`level_name`). Each key is
//! converted to PascalCase (`LevelName`) and looked up in a
//! [`ProcessorRegistry`] built once per formatter. A key with no registered
//! processor is a schema error, not something to drop silently.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde_json::Value;

use crate::level::SeqLevel;
use crate::log_record::{Context, EXCEPTION_KEY, FieldValue};

use super::NormalizeError;
use super::envelope::{NormalizedEnvelope, SOURCE_CONTEXT};
use super::value::NormalizeLimits;

/// A field processor.
///
/// Receives the envelope being built, the raw field value and the limits of
/// the owning formatter.
pub type Processor = Arc<
    dyn Fn(&mut NormalizedEnvelope, FieldValue, &NormalizeLimits) -> Result<(), NormalizeError>
        + Send
        + Sync,
>;

/// Convert a snake- or kebab-case key into PascalCase.
///
/// ```rust
/// use seqlog::formatter::to_pascal_case;
///
/// assert_eq!(to_pascal_case("level_name"), "LevelName");
/// assert_eq!(to_pascal_case("date-time"), "DateTime");
/// assert_eq!(to_pascal_case("datetime"), "Datetime");
/// ```
pub fn to_pascal_case(key: &str) -> String {
    key.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Mapping from canonical field name to processor.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Processor>,
}

impl ProcessorRegistry {
    /// A registry with no processors.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry covering the standard facade fields.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("Message", process_message);
        registry.register("Context", process_context);
        registry.register("Level", process_level);
        registry.register("LevelName", process_level_name);
        registry.register("Channel", process_channel);
        registry.register("Datetime", process_datetime);
        registry.register("Extra", process_extra);
        registry
    }

    /// Register `processor` under canonical `field`, replacing any previous one.
    pub fn register<F>(&mut self, field: impl Into<String>, processor: F) -> Option<Processor>
    where
        F: Fn(&mut NormalizedEnvelope, FieldValue, &NormalizeLimits) -> Result<(), NormalizeError>
            + Send
            + Sync
            + 'static,
    {
        self.processors.insert(field.into(), Arc::new(processor))
    }

    /// Whether a processor exists for canonical `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.processors.contains_key(field)
    }

    /// Route a raw `key` to its processor.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::WrongCodePath`] when no processor is
    /// registered for the converted key, and whatever the processor itself
    /// reports otherwise.
    pub fn dispatch(
        &self,
        key: &str,
        envelope: &mut NormalizedEnvelope,
        value: FieldValue,
        limits: &NormalizeLimits,
    ) -> Result<(), NormalizeError> {
        let field = to_pascal_case(key);
        let Some(processor) = self.processors.get(&field) else {
            return Err(NormalizeError::WrongCodePath {
                key: key.to_owned(),
                field,
            });
        };
        processor(envelope, value, limits)
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("ProcessorRegistry")
            .field("fields", &fields)
            .finish()
    }
}

fn mismatch(field: &str, expected: &'static str, value: &FieldValue) -> NormalizeError {
    NormalizeError::InvalidFieldType {
        field: field.to_owned(),
        expected,
        found: value.kind(),
    }
}

fn expect_text(field: &str, value: FieldValue) -> Result<String, NormalizeError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        other => Err(mismatch(field, "string", &other)),
    }
}

/// Accepts maps, plus the empty JSON array some producers emit for "no entries".
fn expect_map(field: &str, value: FieldValue) -> Result<Context, NormalizeError> {
    match value {
        FieldValue::Map(map) => Ok(map),
        FieldValue::Json(Value::Array(items)) if items.is_empty() => Ok(Context::new()),
        other => Err(mismatch(field, "map", &other)),
    }
}

/// Format a timestamp as ISO-8601, using `Z` for UTC.
pub fn format_timestamp(datetime: &DateTime<FixedOffset>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn process_message(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    _: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    envelope.message_template = Some(expect_text("Message", value)?);
    Ok(())
}

fn process_level(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    _: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    match value {
        FieldValue::Integer(code) => {
            envelope.level = Some(SeqLevel::from_code(code));
            Ok(())
        }
        other => Err(mismatch("Level", "integer", &other)),
    }
}

/// The numeric level wins; the name only fills `Level` when it is still unset.
fn process_level_name(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    _: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    let name = expect_text("LevelName", value)?;
    if envelope.level.is_none() {
        envelope.level = name.parse().ok();
    }
    Ok(())
}

fn process_channel(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    _: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    let channel = expect_text("Channel", value)?;
    envelope
        .properties_mut()
        .insert(SOURCE_CONTEXT.to_owned(), Value::String(channel));
    Ok(())
}

fn process_datetime(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    _: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    let datetime = match value {
        FieldValue::Timestamp(datetime) => datetime,
        FieldValue::Text(text) => DateTime::parse_from_rfc3339(&text).map_err(|_| {
            NormalizeError::InvalidFieldType {
                field: "Datetime".to_owned(),
                expected: "RFC 3339 timestamp",
                found: "string",
            }
        })?,
        other => return Err(mismatch("Datetime", "timestamp", &other)),
    };
    envelope.timestamp = Some(format_timestamp(&datetime));
    Ok(())
}

fn process_context(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    limits: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    let context = expect_map("Context", value)?;
    merge_properties(envelope, context, limits);
    Ok(())
}

fn process_extra(
    envelope: &mut NormalizedEnvelope,
    value: FieldValue,
    limits: &NormalizeLimits,
) -> Result<(), NormalizeError> {
    let extra = expect_map("Extra", value)?;
    merge_properties(envelope, extra, limits);
    Ok(())
}

/// Lift an attached error into `Exception`, then merge the rest into `Properties`.
///
/// The reserved entry is only removed when it actually holds an error.
fn merge_properties(envelope: &mut NormalizedEnvelope, mut map: Context, limits: &NormalizeLimits) {
    if map
        .get(EXCEPTION_KEY)
        .and_then(|value| value.as_error())
        .is_some()
        && let Some(error) = map.remove(EXCEPTION_KEY).and_then(|v| v.as_error().cloned())
    {
        envelope.exception = Some(limits.exception_serializer().serialize(error.as_ref()));
    }

    if map.is_empty() {
        return;
    }
    let properties = envelope.properties_mut();
    for (key, value) in map {
        properties.insert(key, limits.property_value(value));
    }
}
