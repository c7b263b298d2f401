//! Diagnostic sink that accumulates lines in memory for test assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::http_handler::DiagnosticSink;

/// Sink that stores every line it receives for later inspection.
#[derive(Clone, Debug, Default)]
pub struct CollectingDiagnostics {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, message: &str) {
        self.lines.lock().push(message.to_owned());
    }
}
