//! Exception serialization.
//!
//! Converts a [`LoggableError`] graph into the [`ExceptionRecord`] stored
//! under an envelope's `Exception` key. The causing-error chain is followed
//! up to a fixed depth; past it the chain ends in a single placeholder
//! string, which also terminates cycles created by errors that point back
//! at themselves.

use crate::exception_schema::{
    ExceptionRecord, FaultDetail, FaultInfo, LoggableError, SerializedException, StackFrame,
};

/// Default recursion limit shared with property normalization.
pub const DEFAULT_MAX_DEPTH: usize = 9;

/// Placeholder text emitted once nesting exceeds `max_depth`.
pub fn depth_placeholder(max_depth: usize) -> String {
    format!("Over {max_depth} levels deep, aborting normalization")
}

/// Serializes errors into [`ExceptionRecord`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExceptionSerializer {
    max_depth: usize,
}

impl Default for ExceptionSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ExceptionSerializer {
    /// Create a serializer that stops following causes past `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Serialize `err` and its causes.
    pub fn serialize(&self, err: &dyn LoggableError) -> ExceptionRecord {
        self.serialize_at(err, 0)
    }

    /// Serialize `err` as if it sat `depth` links down a cause chain.
    ///
    /// This never fails: frames without a location are skipped and the
    /// chain is cut with a placeholder once `depth` exceeds the limit.
    pub fn serialize_at(&self, err: &dyn LoggableError, depth: usize) -> ExceptionRecord {
        if depth > self.max_depth {
            return ExceptionRecord::Truncated(depth_placeholder(self.max_depth));
        }

        if let Some(described) = err.as_self_describing() {
            return ExceptionRecord::SelfDescribed(described.as_structured_record());
        }

        let mut data = SerializedException {
            class: err.class_name(),
            message: err.message(),
            code: err.code(),
            file: origin(err),
            ..SerializedException::default()
        };

        if let Some(fault) = err.fault() {
            apply_fault(&mut data, fault);
        }

        data.trace = err.frames().iter().filter_map(StackFrame::location).collect();

        if let Some(previous) = err.previous() {
            data.previous = Some(Box::new(self.serialize_at(previous, depth + 1)));
        }

        ExceptionRecord::Structured(data)
    }
}

/// `file:line` of the error origin, or an empty string when unknown.
fn origin(err: &dyn LoggableError) -> String {
    match err.file() {
        Some(file) => format!("{file}:{}", err.line().unwrap_or(0)),
        None => String::new(),
    }
}

fn apply_fault(data: &mut SerializedException, fault: &FaultInfo) {
    data.faultcode = fault.faultcode.clone();
    data.faultactor = fault.faultactor.clone();
    data.detail = fault.detail.as_ref().map(|detail| match detail {
        FaultDetail::Text(text) => text.clone(),
        FaultDetail::Structured(value) => value.to_string(),
    });
}
