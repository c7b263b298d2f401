//! Fallback channel for delivery failures.

/// Prefix carried by every diagnostic line.
pub const DIAGNOSTIC_PREFIX: &str = "[SEQ LOGGING ERROR]";

/// Receives one line per failed delivery.
///
/// Implementations must not fail or block for long; they run on the
/// delivering thread.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Writes diagnostics through the `log` facade at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn report(&self, message: &str) {
        log::error!(target: "seqlog", "{DIAGNOSTIC_PREFIX} {message}");
    }
}
