//! Size and depth limits applied to property values.

use serde_json::{Map, Value};

use crate::log_record::ContextValue;

use super::exception::{DEFAULT_MAX_DEPTH, ExceptionSerializer, depth_placeholder};

/// Default cap on entries kept per array or object.
pub const DEFAULT_MAX_ITEM_COUNT: usize = 1000;

/// Key marking a truncated object.
const TRUNCATION_KEY: &str = "...";

/// Limits shared by the processors of one formatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizeLimits {
    pub max_depth: usize,
    pub max_item_count: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_item_count: DEFAULT_MAX_ITEM_COUNT,
        }
    }
}

impl NormalizeLimits {
    /// Exception serializer honouring the same depth limit.
    pub fn exception_serializer(&self) -> ExceptionSerializer {
        ExceptionSerializer::new(self.max_depth)
    }

    /// Convert a context entry into a property value.
    ///
    /// Errors stored under ordinary keys are serialized like the reserved
    /// `exception` entry, just without being lifted out of the map.
    pub fn property_value(&self, value: ContextValue) -> Value {
        match value {
            ContextValue::Json(json) => self.limit(json, 1),
            ContextValue::Error(err) => {
                let record = self.exception_serializer().serialize_at(err.as_ref(), 1);
                serde_json::to_value(record).unwrap_or_else(|e| Value::String(e.to_string()))
            }
        }
    }

    /// Apply depth and item-count limits to `value` found at `depth`.
    pub fn limit(&self, value: Value, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::String(depth_placeholder(self.max_depth));
        }
        match value {
            Value::Array(items) => Value::Array(self.limit_array(items, depth)),
            Value::Object(map) => Value::Object(self.limit_object(map, depth)),
            scalar => scalar,
        }
    }

    fn limit_array(&self, items: Vec<Value>, depth: usize) -> Vec<Value> {
        let total = items.len();
        let mut out: Vec<Value> = items
            .into_iter()
            .take(self.max_item_count)
            .map(|item| self.limit(item, depth + 1))
            .collect();
        if total > self.max_item_count {
            out.push(Value::String(self.item_placeholder(total)));
        }
        out
    }

    fn limit_object(&self, map: Map<String, Value>, depth: usize) -> Map<String, Value> {
        let total = map.len();
        let mut out: Map<String, Value> = map
            .into_iter()
            .take(self.max_item_count)
            .map(|(key, item)| (key, self.limit(item, depth + 1)))
            .collect();
        if total > self.max_item_count {
            out.insert(
                TRUNCATION_KEY.to_owned(),
                Value::String(self.item_placeholder(total)),
            );
        }
        out
    }

    fn item_placeholder(&self, total: usize) -> String {
        format!(
            "Over {} items ({total} total), aborting normalization",
            self.max_item_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception_schema::CapturedError;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn nested(levels: usize) -> Value {
        let mut value = json!("leaf");
        for _ in 0..levels {
            value = json!({ "inner": value });
        }
        value
    }

    #[rstest]
    fn scalars_pass_through() {
        let limits = NormalizeLimits::default();
        assert_eq!(limits.limit(json!(42), 1), json!(42));
        assert_eq!(limits.limit(json!("text"), 1), json!("text"));
        assert_eq!(limits.limit(Value::Null, 1), Value::Null);
    }

    #[rstest]
    fn deep_values_are_cut() {
        let limits = NormalizeLimits {
            max_depth: 2,
            ..NormalizeLimits::default()
        };
        let limited = limits.limit(nested(3), 1);
        assert_eq!(
            limited,
            json!({"inner": {"inner": "Over 2 levels deep, aborting normalization"}})
        );
    }

    #[rstest]
    fn long_arrays_are_truncated() {
        let limits = NormalizeLimits {
            max_item_count: 2,
            ..NormalizeLimits::default()
        };
        let limited = limits.limit(json!([1, 2, 3, 4]), 1);
        assert_eq!(
            limited,
            json!([1, 2, "Over 2 items (4 total), aborting normalization"])
        );
    }

    #[rstest]
    fn wide_objects_are_truncated_with_marker() {
        let limits = NormalizeLimits {
            max_item_count: 1,
            ..NormalizeLimits::default()
        };
        let limited = limits.limit(json!({"a": 1, "b": 2}), 1);
        assert_eq!(
            limited,
            json!({"a": 1, "...": "Over 1 items (2 total), aborting normalization"})
        );
    }

    #[rstest]
    fn errors_under_plain_keys_are_serialized() {
        let limits = NormalizeLimits::default();
        let value = limits.property_value(ContextValue::Error(Arc::new(CapturedError::new(
            "IOError",
            "disk full",
        ))));
        assert_eq!(value["class"], "IOError");
        assert_eq!(value["message"], "disk full");
    }
}
