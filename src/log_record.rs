//! Raw log records as produced by the upstream logging facade.
//!
//! A [`RawLogRecord`] is an ordered list of named fields rather than a fixed
//! struct: the normalizer dispatches on whatever keys are present, so the
//! record shape stays open to extension while unknown keys are still caught
//! at normalization time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use serde_json::Value;

use crate::exception_schema::LoggableError;
use crate::formatter::NormalizeError;

/// Key holding the message text.
pub const MESSAGE: &str = "message";
/// Key holding the context map.
pub const CONTEXT: &str = "context";
/// Key holding the numeric severity code.
pub const LEVEL: &str = "level";
/// Key holding the facade level name.
pub const LEVEL_NAME: &str = "level_name";
/// Key holding the channel (logger) name.
pub const CHANNEL: &str = "channel";
/// Key holding the record timestamp.
pub const DATETIME: &str = "datetime";
/// Key holding processor-supplied extra data.
pub const EXTRA: &str = "extra";
/// Reserved context/extra entry carrying an attached error.
pub const EXCEPTION_KEY: &str = "exception";

/// A value stored in a context or extra map.
#[derive(Clone, Debug)]
pub enum ContextValue {
    /// Plain data.
    Json(Value),
    /// An attached error.
    Error(Arc<dyn LoggableError>),
}

impl ContextValue {
    /// Borrow the attached error, if this value is one.
    pub fn as_error(&self) -> Option<&Arc<dyn LoggableError>> {
        match self {
            Self::Error(err) => Some(err),
            Self::Json(_) => None,
        }
    }

    /// Short description of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(value) => json_kind(value),
            Self::Error(_) => "error",
        }
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Arc<dyn LoggableError>> for ContextValue {
    fn from(err: Arc<dyn LoggableError>) -> Self {
        Self::Error(err)
    }
}

impl<E: LoggableError + 'static> From<E> for ContextValue {
    fn from(err: E) -> Self {
        Self::Error(Arc::new(err))
    }
}

/// Insertion-ordered string-keyed map of [`ContextValue`]s.
///
/// Inserting an existing key replaces its value in place.
#[derive(Clone, Debug, Default)]
pub struct Context {
    entries: Vec<(String, ContextValue)>,
}

impl Context {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Option<ContextValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up `key`.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Context {
    type Item = (String, ContextValue);
    type IntoIter = std::vec::IntoIter<(String, ContextValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<ContextValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (k, v) in iter {
            context.insert(k, v);
        }
        context
    }
}

/// A single field of a raw record.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<FixedOffset>),
    Map(Context),
    /// Any other loosely-typed value.
    Json(Value),
}

impl FieldValue {
    /// Short description of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Integer(_) => "integer",
            Self::Timestamp(_) => "timestamp",
            Self::Map(_) => "map",
            Self::Json(value) => json_kind(value),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Number(n) if n.is_i64() => Self::Integer(n.as_i64().unwrap_or_default()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ContextValue::Json(v)))
                    .collect(),
            ),
            other => Self::Json(other),
        }
    }
}

/// Name of a JSON value's type.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Log record handed over by the logging facade.
///
/// Fields are kept in insertion order; setting an existing key replaces it
/// in place.
#[derive(Clone, Debug, Default)]
pub struct RawLogRecord {
    fields: Vec<(String, FieldValue)>,
}

impl RawLogRecord {
    /// Construct a record with the standard facade fields.
    ///
    /// The timestamp is taken from the local clock; context and extra start
    /// empty. Key order follows the facade: message, context, level,
    /// level_name, channel, datetime, extra.
    pub fn new(channel: &str, level: i64, message: &str) -> Self {
        Self::at(channel, level, message, Local::now().fixed_offset())
    }

    /// Like [`new`](Self::new) with an explicit timestamp.
    pub fn at(channel: &str, level: i64, message: &str, datetime: DateTime<FixedOffset>) -> Self {
        let level_name = level_name_for(level);
        Self::empty()
            .with_field(MESSAGE, FieldValue::Text(message.to_owned()))
            .with_field(CONTEXT, FieldValue::Map(Context::new()))
            .with_field(LEVEL, FieldValue::Integer(level))
            .with_field(LEVEL_NAME, FieldValue::Text(level_name.to_owned()))
            .with_field(CHANNEL, FieldValue::Text(channel.to_owned()))
            .with_field(DATETIME, FieldValue::Timestamp(datetime))
            .with_field(EXTRA, FieldValue::Map(Context::new()))
    }

    /// A record with no fields at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value in place.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.set(key, value);
        self
    }

    /// Replace the context map.
    #[must_use]
    pub fn with_context(self, context: Context) -> Self {
        self.with_field(CONTEXT, FieldValue::Map(context))
    }

    /// Replace the extra map.
    #[must_use]
    pub fn with_extra(self, extra: Context) -> Self {
        self.with_field(EXTRA, FieldValue::Map(extra))
    }

    /// Attach an error under the reserved context key.
    #[must_use]
    pub fn with_exception(mut self, error: impl LoggableError + 'static) -> Self {
        let value = ContextValue::Error(Arc::new(error));
        match self.get_mut(CONTEXT) {
            Some(FieldValue::Map(context)) => {
                context.insert(EXCEPTION_KEY, value);
                self
            }
            _ => self.with_context(Context::new().with(EXCEPTION_KEY, value)),
        }
    }

    /// Set `key`, replacing any previous value in place.
    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Look up `key`.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric severity, if the record carries one.
    pub fn level(&self) -> Option<i64> {
        match self.get(LEVEL)? {
            FieldValue::Integer(level) => Some(*level),
            _ => None,
        }
    }

    /// Message text, if the record carries one.
    pub fn message(&self) -> Option<&str> {
        match self.get(MESSAGE)? {
            FieldValue::Text(message) => Some(message),
            _ => None,
        }
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for RawLogRecord {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl TryFrom<Value> for RawLogRecord {
    type Error = NormalizeError;

    /// Build a record from a decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidInput`] when `value` is not an
    /// object.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(NormalizeError::InvalidInput(format!(
                "Object expected, got {}",
                json_kind(&value)
            )));
        };
        Ok(Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect(),
        })
    }
}

fn level_name_for(level: i64) -> &'static str {
    match level {
        crate::level::DEBUG => "DEBUG",
        crate::level::INFO => "INFO",
        crate::level::NOTICE => "NOTICE",
        crate::level::WARNING => "WARNING",
        crate::level::ERROR => "ERROR",
        crate::level::CRITICAL => "CRITICAL",
        crate::level::ALERT => "ALERT",
        crate::level::EMERGENCY => "EMERGENCY",
        _ => "UNKNOWN",
    }
}

impl fmt::Display for RawLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.level().map(level_name_for).unwrap_or("UNKNOWN");
        write!(f, "{} - {}", level, self.message().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception_schema::CapturedError;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn new_uses_facade_key_order() {
        let record = RawLogRecord::new("storage", crate::level::ERROR, "Disk full");
        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![MESSAGE, CONTEXT, LEVEL, LEVEL_NAME, CHANNEL, DATETIME, EXTRA]
        );
        assert_eq!(record.level(), Some(400));
        assert_eq!(record.message(), Some("Disk full"));
        assert!(matches!(record.get(LEVEL_NAME), Some(FieldValue::Text(n)) if n == "ERROR"));
    }

    #[rstest]
    fn with_field_replaces_in_place() {
        let record = RawLogRecord::new("app", 200, "first")
            .with_field(MESSAGE, FieldValue::Text("second".into()));
        assert_eq!(record.message(), Some("second"));
        assert_eq!(record.iter().next().map(|(k, _)| k), Some(MESSAGE));
        assert_eq!(record.len(), 7);
    }

    #[rstest]
    fn with_exception_lands_in_context() {
        let record = RawLogRecord::new("app", 400, "boom")
            .with_context(Context::new().with("user", "alice"))
            .with_exception(CapturedError::new("IOError", "disk full"));
        let Some(FieldValue::Map(context)) = record.get(CONTEXT) else {
            panic!("context missing");
        };
        assert_eq!(context.len(), 2);
        assert!(
            context
                .get(EXCEPTION_KEY)
                .and_then(ContextValue::as_error)
                .is_some()
        );
    }

    #[rstest]
    fn context_preserves_order_and_replaces() {
        let mut context = Context::new().with("b", json!(1)).with("a", json!(2));
        assert!(context.insert("b", json!(3)).is_some());
        let keys: Vec<&str> = context.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(matches!(context.remove("b"), Some(ContextValue::Json(v)) if v == json!(3)));
        assert!(!context.contains_key("b"));
    }

    #[rstest]
    fn try_from_json_maps_field_kinds() {
        let record = RawLogRecord::try_from(json!({
            "message": "hi",
            "level": 300,
            "context": {"k": "v"},
            "extra": [1, 2]
        }))
        .expect("object accepted");
        assert!(matches!(record.get("message"), Some(FieldValue::Text(_))));
        assert!(matches!(record.get("level"), Some(FieldValue::Integer(300))));
        assert!(matches!(record.get("context"), Some(FieldValue::Map(m)) if m.len() == 1));
        assert_eq!(record.get("extra").map(FieldValue::kind), Some("array"));
    }

    #[rstest]
    #[case(json!([1, 2]), "array")]
    #[case(json!("text"), "string")]
    #[case(json!(null), "null")]
    #[case(json!(4.5), "number")]
    fn try_from_rejects_non_objects(#[case] value: Value, #[case] kind: &str) {
        let err = RawLogRecord::try_from(value).expect_err("must reject");
        match err {
            NormalizeError::InvalidInput(msg) => assert!(msg.contains(kind), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    fn display_shows_level_and_message() {
        let record = RawLogRecord::new("app", 300, "careful");
        assert_eq!(record.to_string(), "WARNING - careful");
    }
}
