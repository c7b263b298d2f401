//! Handler seam shared by the Seq sinks.

use std::any::Any;

use thiserror::Error;

use crate::formatter::NormalizeError;
use crate::log_record::RawLogRecord;

/// Errors returned by handlers.
///
/// Delivery failures are never reported here; they go to the handler's
/// diagnostic sink instead.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The record could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// The background queue was full and the batch was dropped.
    #[error("handler queue is full")]
    QueueFull,
    /// The handler has been closed.
    #[error("handler is closed")]
    Closed,
}

/// Trait implemented by all Seq handlers.
///
/// Handlers are shared between logging call sites, hence `Send + Sync`.
pub trait SeqHandlerTrait: Send + Sync {
    /// Whether `record` passes the handler's minimum-level gate.
    fn is_handling(&self, record: &RawLogRecord) -> bool;

    /// Handle one record.
    ///
    /// Returns `true` when the record was handled and must not bubble to
    /// further handlers.
    fn handle(&self, record: RawLogRecord) -> Result<bool, HandlerError>;

    /// Handle a batch with a single delivery.
    fn handle_batch(&self, records: Vec<RawLogRecord>) -> Result<(), HandlerError>;

    /// Wait for pending deliveries. Returns `false` when that could not be
    /// confirmed.
    fn flush(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any;
}
