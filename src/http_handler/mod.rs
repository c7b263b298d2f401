//! Seq HTTP sink.
//!
//! [`SeqHTTPHandler`] normalizes a batch of
//! [`RawLogRecord`](crate::log_record::RawLogRecord)s through its formatter
//! and posts the encoded body to a Seq ingestion endpoint in one request.
//!
//! # Outcomes
//!
//! - **201**: delivered.
//! - **No endpoint**: suppressed; nothing is sent.
//! - **Any other status or a transport error**: one line is written to the
//!   handler's [`DiagnosticSink`] and the batch is dropped. There is no retry.
//!
//! [`BackgroundHandler`] moves the request onto a worker thread for hosts
//! that must not block on the endpoint.

mod config;
mod diagnostics;
mod handler;
mod transport;
mod worker;


pub use config::{
    CONTENT_TYPE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_METHOD, DEFAULT_PROTOCOL_VERSION,
    DEFAULT_REQUEST_TIMEOUT, DeliveryOptions,
};
pub use diagnostics::{DIAGNOSTIC_PREFIX, DiagnosticSink, LogDiagnostics};
pub use handler::{DeliveryOutcome, INGESTION_SUCCESS_STATUS, SeqHTTPHandler};
pub use transport::{DeliveryRequest, Transport, TransportError, TransportResponse, UreqTransport};
pub use worker::{
    BackgroundConfig, BackgroundHandler, DEFAULT_CHANNEL_CAPACITY, DEFAULT_FLUSH_TIMEOUT,
};
