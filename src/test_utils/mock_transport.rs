//! Transport double recording requests and replaying scripted responses.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::http_handler::{DeliveryRequest, Transport, TransportError, TransportResponse};

#[derive(Debug)]
enum Scripted {
    Status(u16, String),
    Fail(String),
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Scripted>,
    requests: Vec<DeliveryRequest>,
}

/// Records every request.
///
/// Responses are taken from a script in order; once the script runs out,
/// every request is answered with `201 Created`.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with `status` and `body`.
    #[must_use]
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.state
            .lock()
            .script
            .push_back(Scripted::Status(status, body.into()));
        self
    }

    /// Queue a transport failure with `message`.
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.state
            .lock()
            .script
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<DeliveryRequest> {
        self.state.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &DeliveryRequest) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        match state.script.pop_front() {
            Some(Scripted::Status(status, body)) => Ok(TransportResponse { status, body }),
            Some(Scripted::Fail(message)) => Err(TransportError::Transport(message)),
            None => Ok(TransportResponse {
                status: 201,
                body: String::new(),
            }),
        }
    }
}
