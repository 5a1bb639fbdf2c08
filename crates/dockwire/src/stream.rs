//! Pull-based delivery of streamed JSON documents.
//!
//! An [`EventStream`] owns the connection of one streaming call. Documents are
//! read from the socket only when the consumer asks for the next one, and
//! dropping the stream closes the connection, which is how long-lived
//! subscriptions are cancelled.

use std::collections::VecDeque;
use std::mem;
use std::ops::ControlFlow;

use serde_json::Value;
use tracing::debug;

use crate::buffer::ResponseBuffer;
use crate::call::Call;
use crate::descriptor::ConnectionDescriptor;
use crate::framing::{Dispatcher, Framing, StreamState};
use crate::result::CallResult;
use crate::transport::{self, Exchange, ResponseBody, TransportError};

/// Lazy, unrestartable sequence of documents from one streaming call.
///
/// Iteration ends when the daemon closes the body, when the transport fails,
/// or never, for unbounded subscriptions the consumer abandons. Inspect
/// [`EventStream::result`] or [`EventStream::into_result`] afterwards to learn
/// which of these happened.
pub struct EventStream {
    body: Option<ResponseBody>,
    dispatcher: Dispatcher,
    ready: VecDeque<Value>,
    result: CallResult,
    closed: bool,
}

impl EventStream {
    pub(crate) fn open(descriptor: &ConnectionDescriptor, call: &Call, framing: Framing) -> Self {
        Self::from_exchange(transport::send(descriptor, call), framing)
    }

    fn from_exchange(exchange: Exchange, framing: Framing) -> Self {
        let Exchange { mut result, body: received } = exchange;
        let Some(mut body) = received else {
            return Self::failed(result, framing);
        };
        let delivering = result.status().is_some_and(|status| (200..300).contains(&status));
        if delivering {
            return Self {
                body: Some(body),
                dispatcher: Dispatcher::new(framing),
                ready: VecDeque::new(),
                result,
                closed: false,
            };
        }

        // Error answers are a single document describing the failure.
        let mut buffer = ResponseBuffer::new();
        if let Err(error) = transport::drain(&mut body, &mut buffer) {
            result.fail(error.kind(), error.to_string());
        }
        result.set_response_body(buffer.into_string_lossy());
        Self::failed(result, framing)
    }

    /// Stream for a call refused before any network activity.
    pub(crate) fn rejected(message: impl Into<String>, framing: Framing) -> Self {
        let result = CallResult::rejected(message);
        result.log();
        Self::failed(result, framing)
    }

    fn failed(mut result: CallResult, framing: Framing) -> Self {
        result.finish();
        Self {
            body: None,
            dispatcher: Dispatcher::new(framing),
            ready: VecDeque::new(),
            result,
            closed: true,
        }
    }

    /// Outcome recorded so far.
    ///
    /// While the stream is live the result carries the status but no end time.
    #[must_use]
    pub const fn result(&self) -> &CallResult {
        &self.result
    }

    /// Whether the connection is still open.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !self.closed
    }

    /// Framing applied to the body.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.dispatcher.framing()
    }

    /// Stops the stream, closing the connection, and returns the outcome.
    ///
    /// Documents not yet pulled are discarded.
    #[must_use]
    pub fn into_result(mut self) -> CallResult {
        if !self.closed {
            debug!(url = self.result.url().unwrap_or_default(), "stream closed by consumer");
            self.close();
        }
        self.result
    }

    /// Passes each document to `handler` in arrival order until the stream
    /// ends or the handler breaks.
    ///
    /// Returns the outcome, as [`EventStream::into_result`] does.
    pub fn for_each_document<F>(mut self, mut handler: F) -> CallResult
    where
        F: FnMut(Value) -> ControlFlow<()>,
    {
        for document in self.by_ref() {
            if handler(document).is_break() {
                break;
            }
        }
        self.into_result()
    }

    pub(crate) fn require_status(&mut self, accepted: &[u16]) {
        self.result.require_status(accepted);
    }

    fn pump(&mut self) {
        let Some(body) = self.body.as_mut() else {
            self.close();
            return;
        };
        match body.next_chunk() {
            Ok(None) => {
                self.ready.extend(self.dispatcher.finish());
                self.close();
            }
            Ok(Some(chunk)) => match self.dispatcher.push(&chunk) {
                Ok(documents) => self.ready.extend(documents),
                Err(error) => self.abort(&TransportError::from(error)),
            },
            Err(error) => self.abort(&error),
        }
    }

    fn abort(&mut self, error: &TransportError) {
        self.result.fail(error.kind(), error.to_string());
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.body = None;
        let framing = self.dispatcher.framing();
        let dispatcher = mem::replace(&mut self.dispatcher, Dispatcher::new(framing));
        if dispatcher.state() != StreamState::StreamClosed && !dispatcher.pending().is_empty() {
            debug!(
                bytes = dispatcher.pending().len(),
                "stream ended inside an undelivered document"
            );
        }
        let remainder = dispatcher.into_remainder();
        if !remainder.is_empty() {
            self.result.set_response_body(remainder.into_string_lossy());
        }
        self.result.finish();
        self.result.log();
    }
}

impl Iterator for EventStream {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            if let Some(document) = self.ready.pop_front() {
                return Some(document);
            }
            if self.closed {
                return None;
            }
            self.pump();
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EventStream")
            .field("framing", &self.dispatcher.framing())
            .field("state", &self.dispatcher.state())
            .field("ready", &self.ready.len())
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Method;
    use crate::result::ErrorKind;

    #[test]
    fn failed_stream_yields_nothing() {
        let mut result = CallResult::begin(Method::Get, "unix:///d.sock/v1.39/events", None);
        result.fail(ErrorKind::ConnectionFailed, "refused");
        let mut stream = EventStream::failed(result, Framing::Lines);
        assert!(stream.next().is_none());
        assert!(!stream.is_live());
        let result = stream.into_result();
        assert_eq!(result.kind(), ErrorKind::ConnectionFailed);
        assert!(result.finished_at().is_some());
    }
}
