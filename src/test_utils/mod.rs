//! Test helpers shared by unit and integration tests.
//!
//! Compiled for unit tests and behind the `test-util` feature so the
//! integration tests under `tests/` can substitute transports and
//! diagnostic sinks.

mod collecting_diagnostics;
mod mock_transport;

pub use collecting_diagnostics::CollectingDiagnostics;
pub use mock_transport::MockTransport;
