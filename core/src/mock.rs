//! Scripted transport for tests.
//!
//! `MockTransport` hands out queued outcomes in order and records every
//! request it receives, so request construction and response handling can be
//! tested without a server. Enable the `mock` feature to use it from another
//! crate's tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

enum Outcome {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with `status` and a JSON (or any) text body.
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Outcome::Respond(HttpResponse::new(status, body)))
    }

    pub fn respond_with(self, response: HttpResponse) -> Self {
        self.push(Outcome::Respond(response))
    }

    /// Queue a transport failure with the given message.
    pub fn fail(self, message: &str) -> Self {
        self.push(Outcome::Fail(message.to_string()))
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    fn push(self, outcome: Outcome) -> Self {
        lock(&self.outcomes).push_back(outcome);
        self
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request);
        match lock(&self.outcomes).pop_front() {
            Some(Outcome::Respond(response)) => Ok(response),
            Some(Outcome::Fail(message)) => Err(message.into()),
            None => Err("mock transport has no queued response".into()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
