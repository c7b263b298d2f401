//! Background delivery.
//!
//! [`BackgroundHandler`] keeps normalization on the calling thread, so
//! structural errors still reach the caller, and moves the HTTP request to
//! a single worker thread fed by a bounded channel. Batches are delivered
//! in the order they were queued.

use std::{
    any::Any,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{
    handler::{HandlerError, SeqHandlerTrait},
    log_record::RawLogRecord,
    rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner},
};

use super::handler::SeqHTTPHandler;

/// Default bounded channel capacity, in batches.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default time `flush` and `close` wait for the worker.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Commands processed by the worker thread.
#[derive(Debug)]
pub(crate) enum DeliveryCommand {
    Batch(String),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Queue and timing settings for [`BackgroundHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundConfig {
    pub capacity: usize,
    pub flush_timeout: Duration,
    pub warn_interval: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

/// [`SeqHTTPHandler`] whose requests run on a worker thread.
///
/// A full queue drops the batch and emits a rate-limited warning instead of
/// blocking the caller. Dropping the handler drains the queue and joins the
/// worker.
pub struct BackgroundHandler {
    handler: Arc<SeqHTTPHandler>,
    tx: Option<Sender<DeliveryCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    warner: RateLimitedWarner,
    flush_timeout: Duration,
}

impl BackgroundHandler {
    /// Wrap `handler` using the default queue settings.
    pub fn new(handler: SeqHTTPHandler) -> Self {
        Self::with_config(handler, BackgroundConfig::default())
    }

    /// Wrap `handler` and start its worker thread.
    pub fn with_config(handler: SeqHTTPHandler, config: BackgroundConfig) -> Self {
        let handler = Arc::new(handler);
        let (tx, handle) = spawn_worker(Arc::clone(&handler), config.capacity);
        Self {
            handler,
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            warner: RateLimitedWarner::new(config.warn_interval),
            flush_timeout: config.flush_timeout,
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &SeqHTTPHandler {
        &self.handler
    }

    /// Wait until every batch queued so far has been delivered.
    pub fn flush(&self) -> bool {
        <Self as SeqHandlerTrait>::flush(self)
    }

    /// Close the handler and wait for the worker to exit.
    pub fn close(&mut self) {
        self.request_shutdown();
        self.join_worker();
    }

    fn enqueue(&self, body: String) -> Result<(), HandlerError> {
        let Some(tx) = self.tx.as_ref() else {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!("SeqHTTPHandler dropped {count} batches after shutdown");
            });
            return Err(HandlerError::Closed);
        };
        match tx.try_send(DeliveryCommand::Batch(body)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    warn!("SeqHTTPHandler queue full; dropped {count} batches");
                });
                Err(HandlerError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    warn!("SeqHTTPHandler worker gone; dropped {count} batches");
                });
                Err(HandlerError::Closed)
            }
        }
    }

    fn request_shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(DeliveryCommand::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv_timeout(self.flush_timeout);
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("SeqHTTPHandler: worker thread panicked");
        }
    }
}

impl SeqHandlerTrait for BackgroundHandler {
    fn is_handling(&self, record: &RawLogRecord) -> bool {
        self.handler.is_handling(record)
    }

    fn handle(&self, record: RawLogRecord) -> Result<bool, HandlerError> {
        if !self.handler.is_handling(&record) {
            return Ok(false);
        }
        self.handle_batch(vec![record])?;
        Ok(!self.handler.bubble())
    }

    fn handle_batch(&self, records: Vec<RawLogRecord>) -> Result<(), HandlerError> {
        match self.handler.prepare_batch(records)? {
            Some(body) => self.enqueue(body),
            None => Ok(()),
        }
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush(|count| {
            warn!("SeqHTTPHandler dropped {count} batches in the last interval");
        });
        flush_queue(tx, self.flush_timeout)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for BackgroundHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BackgroundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundHandler")
            .field("handler", &self.handler)
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}

fn spawn_worker(
    handler: Arc<SeqHTTPHandler>,
    capacity: usize,
) -> (Sender<DeliveryCommand>, thread::JoinHandle<()>) {
    let (tx, rx) = bounded(capacity);
    let handle = thread::spawn(move || run(&handler, &rx));
    (tx, handle)
}

fn run(handler: &SeqHTTPHandler, rx: &Receiver<DeliveryCommand>) {
    loop {
        match rx.recv() {
            Ok(DeliveryCommand::Batch(body)) => {
                handler.deliver(body);
            }
            Ok(DeliveryCommand::Flush(ack)) => {
                let _ = ack.send(());
            }
            Ok(DeliveryCommand::Shutdown(ack)) => {
                drain_pending(handler, rx);
                let _ = ack.send(());
                break;
            }
            Err(_) => {
                drain_pending(handler, rx);
                break;
            }
        }
    }
}

fn drain_pending(handler: &SeqHTTPHandler, rx: &Receiver<DeliveryCommand>) {
    loop {
        match rx.try_recv() {
            Ok(DeliveryCommand::Batch(body)) => {
                handler.deliver(body);
            }
            Ok(DeliveryCommand::Flush(ack)) | Ok(DeliveryCommand::Shutdown(ack)) => {
                let _ = ack.send(());
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
}

/// Sends a flush command and waits for the acknowledgement.
///
/// The total wait, send included, never exceeds `timeout`. Because the
/// worker is FIFO, the acknowledgement implies every earlier batch has been
/// delivered or reported.
fn flush_queue(tx: &Sender<DeliveryCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(DeliveryCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}
