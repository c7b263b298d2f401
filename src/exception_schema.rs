//! Error model consumed by the exception serializer.
//!
//! Application errors reach the formatter as trait objects implementing
//! [`LoggableError`]. The trait exposes the pieces Seq wants to show (class,
//! message, numeric code, origin, stack frames and the causing error) with
//! defaults so that most implementations only provide a name and message.
//!
//! Two optional capabilities are expressed as explicit accessors rather than
//! runtime type tests:
//!
//! - [`SelfDescribing`]: the error already knows its structured shape and
//!   bypasses generic serialization entirely.
//! - [`FaultInfo`]: remote-procedure faults carry `faultcode`, `faultactor`
//!   and `detail` fields that are copied onto the serialized record.
//!
//! The serialized side of the model is [`ExceptionRecord`], which is what
//! ends up under the `Exception` key of an envelope.
//!
//! # Example
//!
//! ```rust
//! use seqlog::exception_schema::{CapturedError, LoggableError};
//!
//! let cause = CapturedError::new("IOError", "disk full").with_location("/srv/app/io.rs", 12);
//! let error = CapturedError::new("UploadError", "upload failed").with_previous(cause);
//!
//! assert_eq!(error.class_name(), "UploadError");
//! assert_eq!(error.previous().map(|p| p.message()), Some("disk full".to_string()));
//! ```

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error that can be attached to a log record.
///
/// Only [`class_name`](Self::class_name) and [`message`](Self::message) are
/// required.
pub trait LoggableError: Send + Sync + fmt::Debug {
    /// Short class or type name, e.g. `IOError`.
    fn class_name(&self) -> String;

    /// Human-readable message.
    fn message(&self) -> String;

    /// Numeric error code; zero when the error has none.
    fn code(&self) -> i64 {
        0
    }

    /// Source file where the error originated.
    fn file(&self) -> Option<&str> {
        None
    }

    /// Line within [`file`](Self::file).
    fn line(&self) -> Option<u32> {
        None
    }

    /// Stack frames, innermost first.
    fn frames(&self) -> &[StackFrame] {
        &[]
    }

    /// The error that caused this one.
    fn previous(&self) -> Option<&dyn LoggableError> {
        None
    }

    /// Remote-procedure fault details, when this error is such a fault.
    fn fault(&self) -> Option<&FaultInfo> {
        None
    }

    /// Self-describing capability; returning `Some` skips generic serialization.
    fn as_self_describing(&self) -> Option<&dyn SelfDescribing> {
        None
    }
}

/// Errors that produce their own structured representation.
pub trait SelfDescribing {
    /// Structured record emitted verbatim under `Exception`.
    fn as_structured_record(&self) -> Value;
}

/// A single stack frame.
///
/// Frames without a file are kept here but skipped when serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Source file, when known.
    pub file: Option<String>,
    /// Line number within `file`.
    pub line: Option<u32>,
    /// Function or symbol name.
    pub function: Option<String>,
}

impl StackFrame {
    /// Create a frame with a known location.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            function: None,
        }
    }

    /// Create a frame that only knows its symbol.
    pub fn symbol(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    /// `file:line` rendering, or `None` for frames without a file.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_deref()?;
        Some(format!("{file}:{}", self.line.unwrap_or(0)))
    }
}

/// Fault detail payload.
#[derive(Clone, Debug, PartialEq)]
pub enum FaultDetail {
    /// Plain text, copied verbatim.
    Text(String),
    /// Structured detail, JSON-encoded when serialized.
    Structured(Value),
}

/// Remote-procedure fault fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaultInfo {
    pub faultcode: Option<String>,
    pub faultactor: Option<String>,
    pub detail: Option<FaultDetail>,
}

/// Owned error value for application code that has no richer error type.
///
/// # Examples
///
/// ```rust
/// use seqlog::exception_schema::{CapturedError, LoggableError, StackFrame};
///
/// let error = CapturedError::new("IOError", "disk full")
///     .with_code(28)
///     .with_location("/srv/app/store.rs", 88)
///     .with_frames(vec![StackFrame::new("/srv/app/main.rs", 10)]);
///
/// assert_eq!(error.code(), 28);
/// assert_eq!(error.line(), Some(88));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapturedError {
    pub class: String,
    pub message: String,
    pub code: i64,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub frames: Vec<StackFrame>,
    pub fault: Option<FaultInfo>,
    pub previous: Option<Box<CapturedError>>,
}

impl CapturedError {
    /// Create an error with a class name and message.
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Capture a standard library error and its `source()` chain.
    ///
    /// The outermost error takes its class from the Rust type name and its
    /// location from the caller. Sources are reached through trait objects,
    /// so they are recorded with the generic class `Error`.
    #[track_caller]
    pub fn from_std<E>(err: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        let caller = Location::caller();
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(inner) = source {
            messages.push(inner.to_string());
            source = inner.source();
        }

        let mut previous: Option<Box<CapturedError>> = None;
        for message in messages.drain(1..).rev() {
            let mut captured = CapturedError::new("Error", message);
            captured.previous = previous.take();
            previous = Some(Box::new(captured));
        }

        let outer = messages.pop().unwrap_or_default();
        Self {
            class: short_type_name(std::any::type_name::<E>()).to_owned(),
            message: outer,
            file: Some(caller.file().to_owned()),
            line: Some(caller.line()),
            previous,
            ..Self::default()
        }
    }

    /// Set the numeric code.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Set the originating file and line.
    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Replace the stack frames.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Replace the stack frames with those of a captured backtrace.
    ///
    /// Frames are only available when the backtrace was actually captured;
    /// a disabled backtrace yields no frames.
    #[must_use]
    pub fn with_backtrace(self, backtrace: &Backtrace) -> Self {
        self.with_frames(parse_backtrace(&backtrace.to_string()))
    }

    /// Mark the error as a remote-procedure fault.
    #[must_use]
    pub fn with_fault(mut self, fault: FaultInfo) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Attach the causing error.
    #[must_use]
    pub fn with_previous(mut self, previous: CapturedError) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }
}

impl LoggableError for CapturedError {
    fn class_name(&self) -> String {
        self.class.clone()
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn code(&self) -> i64 {
        self.code
    }

    fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    fn line(&self) -> Option<u32> {
        self.line
    }

    fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    fn previous(&self) -> Option<&dyn LoggableError> {
        self.previous.as_deref().map(|p| p as &dyn LoggableError)
    }

    fn fault(&self) -> Option<&FaultInfo> {
        self.fault.as_ref()
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Strip module paths and generic arguments from a Rust type name.
fn short_type_name(full: &str) -> &str {
    let full = full.strip_prefix("dyn ").unwrap_or(full);
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Extract frames from the `Display` form of a [`Backtrace`].
///
/// The rendering alternates symbol lines (`  3: crate::module::func`) with
/// optional location lines (`at ./src/lib.rs:10:5`). Symbols that never get
/// a location line are kept without a file.
pub(crate) fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            let Some((file, line_no)) = split_location(location) else {
                continue;
            };
            match frames.last_mut() {
                Some(frame) if frame.file.is_none() => {
                    frame.file = Some(file);
                    frame.line = Some(line_no);
                }
                _ => frames.push(StackFrame {
                    file: Some(file),
                    line: Some(line_no),
                    function: None,
                }),
            }
        } else if let Some((index, symbol)) = line.split_once(": ")
            && index.chars().all(|c| c.is_ascii_digit())
            && !index.is_empty()
        {
            frames.push(StackFrame::symbol(symbol));
        }
    }
    frames
}

/// Split `path:line[:column]` into its path and line.
fn split_location(location: &str) -> Option<(String, u32)> {
    let (head, last) = location.rsplit_once(':')?;
    let last: u32 = last.parse().ok()?;
    match head.rsplit_once(':') {
        Some((path, line)) => match line.parse::<u32>() {
            Ok(line) => Some((path.to_owned(), line)),
            Err(_) => Some((head.to_owned(), last)),
        },
        None => Some((head.to_owned(), last)),
    }
}

/// Serialized exception under the `Exception` envelope key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedException {
    /// Error class name.
    pub class: String,
    /// Error message.
    pub message: String,
    /// Numeric code.
    pub code: i64,
    /// `file:line` of the error origin, empty when unknown.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faultcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faultactor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// `file:line` of every located stack frame.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
    /// Serialized causing error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<ExceptionRecord>>,
}

/// Result of serializing one error in a chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExceptionRecord {
    /// Generic structured form.
    Structured(SerializedException),
    /// Placeholder emitted once the depth limit is exceeded.
    Truncated(String),
    /// Output of a [`SelfDescribing`] error.
    SelfDescribed(Value),
}

impl ExceptionRecord {
    /// Borrow the structured form, if this is one.
    pub fn as_structured(&self) -> Option<&SerializedException> {
        match self {
            Self::Structured(inner) => Some(inner),
            _ => None,
        }
    }

    /// Number of records in the chain, this one included.
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut node = self;
        while let Some(next) = node.as_structured().and_then(|s| s.previous.as_deref()) {
            len += 1;
            node = next;
        }
        len
    }

    /// Last record in the chain.
    pub fn root_cause(&self) -> &ExceptionRecord {
        let mut node = self;
        while let Some(next) = node.as_structured().and_then(|s| s.previous.as_deref()) {
            node = next;
        }
        node
    }
}

#[cfg(test)]
mod tests;
