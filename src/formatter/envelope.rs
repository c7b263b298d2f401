//! Normalized event envelope sent to Seq.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::exception_schema::ExceptionRecord;
use crate::level::SeqLevel;

/// Property key holding the channel name.
pub const SOURCE_CONTEXT: &str = "SourceContext";

/// Canonical Seq event.
///
/// Every field is optional because presence mirrors the keys of the raw
/// record. The wire order is fixed by the field order below.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SeqLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionRecord>,
}

impl NormalizedEnvelope {
    /// Properties map, created on first use.
    pub fn properties_mut(&mut self) -> &mut Map<String, Value> {
        self.properties.get_or_insert_with(Map::new)
    }

    /// Look up a single property.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }
}
