//! Seq log normalization and batch HTTP delivery.
//!
//! Raw records from a Monolog-style logging facade are normalized into
//! compact Seq events by [`SeqFormatter`] and posted in batches by
//! [`SeqHTTPHandler`]. Delivery is fail-open: endpoint and transport errors
//! end up on a [`DiagnosticSink`] and never reach the logging call site.
//!
//! ```rust,no_run
//! use seqlog::{HTTPHandlerBuilder, HandlerBuilderTrait, RawLogRecord, level};
//!
//! let handler = HTTPHandlerBuilder::new()
//!     .with_uri("http://localhost:5341/api/events/raw")
//!     .with_api_key("secret")
//!     .build_inner()?;
//! handler.handle_batch(vec![RawLogRecord::new("app", level::WARNING, "Disk almost full")])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod exception_schema;
pub mod formatter;
pub mod handler;
pub mod handlers;
pub mod http_handler;
pub mod level;
pub mod log_record;
pub mod rate_limited_warner;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use exception_schema::{
    CapturedError, ExceptionRecord, FaultDetail, FaultInfo, LoggableError, SelfDescribing,
    SerializedException, StackFrame,
};
pub use formatter::{
    BatchMode, ExceptionSerializer, NormalizeError, NormalizeLimits, NormalizedEnvelope,
    ProcessorRegistry, RecordFormatter, SeqFormatter, SharedFormatter,
};
pub use handler::{HandlerError, SeqHandlerTrait};
pub use handlers::{HTTPHandlerBuilder, HandlerBuildError, HandlerBuilderTrait};
pub use http_handler::{
    BackgroundConfig, BackgroundHandler, DeliveryOptions, DeliveryOutcome, DeliveryRequest,
    DiagnosticSink, LogDiagnostics, SeqHTTPHandler, Transport, TransportError,
    TransportResponse, UreqTransport,
};
pub use level::{SeqLevel, map_severity};
pub use log_record::{Context, ContextValue, FieldValue, RawLogRecord};
