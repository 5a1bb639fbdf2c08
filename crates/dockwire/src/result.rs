//! Outcome record produced by every call.
//!
//! A [`CallResult`] exists for every invocation, including those rejected
//! before any network activity, so callers can always inspect what happened
//! before touching a parsed payload.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;

use crate::call::Method;

/// Coarse classification of a call's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The exchange completed; the HTTP status may still signal a domain error.
    Success,
    /// Caller arguments were malformed.
    InvalidInput,
    /// The response buffer could not grow.
    AllocFailed,
    /// The daemon could not be reached or the connection broke.
    ConnectionFailed,
    /// The liveness probe did not get the expected answer.
    PingFailed,
    /// The daemon answered in a way the operation does not accept.
    UnknownError,
}

impl ErrorKind {
    /// Stable lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidInput => "invalid input",
            Self::AllocFailed => "allocation failed",
            Self::ConnectionFailed => "connection failed",
            Self::PingFailed => "ping failed",
            Self::UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Timing, status and bodies recorded for one call.
#[derive(Debug, Clone)]
pub struct CallResult {
    kind: ErrorKind,
    started_at: OffsetDateTime,
    finished_at: Option<OffsetDateTime>,
    status: Option<u16>,
    method: Option<Method>,
    url: Option<String>,
    request_body: Option<String>,
    response_body: Option<String>,
    message: Option<String>,
}

impl CallResult {
    /// Starts recording a call that is about to reach the network.
    #[must_use]
    pub fn begin(method: Method, url: impl Into<String>, request_body: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Success,
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
            status: None,
            method: Some(method),
            url: Some(url.into()),
            request_body,
            response_body: None,
            message: None,
        }
    }

    /// Records a call refused before any network activity.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            kind: ErrorKind::InvalidInput,
            started_at: now,
            finished_at: Some(now),
            status: None,
            method: None,
            url: None,
            request_body: None,
            response_body: None,
            message: Some(message.into()),
        }
    }

    /// Outcome classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the call completed without a library-level error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind == ErrorKind::Success
    }

    /// HTTP status, unset when the daemon was never reached.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// HTTP method of the request, if one was built.
    #[must_use]
    pub const fn method(&self) -> Option<Method> {
        self.method
    }

    /// Full request URL, if one was built.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Request body as sent, when it was text.
    #[must_use]
    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    /// Response body as received.
    ///
    /// Streaming calls only keep what the dispatcher did not hand out.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }

    /// Parses the response body as a JSON document.
    #[must_use]
    pub fn response_json(&self) -> Option<Value> {
        let body = self.response_body.as_deref()?.trim();
        if body.is_empty() {
            return None;
        }
        serde_json::from_str(body).ok()
    }

    /// Human-readable detail attached to failures.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Wall-clock time the call started.
    #[must_use]
    pub const fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    /// Wall-clock time the call completed, if it has.
    #[must_use]
    pub const fn finished_at(&self) -> Option<OffsetDateTime> {
        self.finished_at
    }

    /// Elapsed time between start and completion.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        let finished = self.finished_at?;
        Duration::try_from(finished - self.started_at).ok()
    }

    /// Emits the outcome as a tracing event.
    pub fn log(&self) {
        let method = self.method.map_or("-", Method::as_str);
        let url = self.url.as_deref().unwrap_or("-");
        if self.is_ok() {
            tracing::debug!(
                kind = %self.kind,
                status = self.status,
                method,
                url,
                "docker call completed"
            );
        } else {
            tracing::warn!(
                kind = %self.kind,
                status = self.status,
                method,
                url,
                message = self.message.as_deref().unwrap_or(""),
                "docker call failed"
            );
        }
    }

    /// Downgrades a completed call whose status the operation does not accept.
    ///
    /// The status and body are kept; the daemon's `message` field, when
    /// present, becomes the result message.
    pub fn require_status(&mut self, accepted: &[u16]) {
        if !self.is_ok() {
            return;
        }
        let Some(status) = self.status else {
            return;
        };
        if accepted.contains(&status) {
            return;
        }
        let detail = self
            .response_json()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("unexpected HTTP status {status}"));
        self.kind = ErrorKind::UnknownError;
        self.message = Some(detail);
        self.log();
    }

    pub(crate) fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.kind = kind;
        self.message = Some(message.into());
        self.finish();
    }

    pub(crate) fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub(crate) fn set_response_body(&mut self, body: String) {
        self.response_body = Some(body);
    }

    pub(crate) fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(OffsetDateTime::now_utc());
        }
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.kind)?;
        if let Some(message) = &self.message {
            write!(formatter, ": {message}")?;
        }
        if let (Some(method), Some(url)) = (self.method, &self.url) {
            write!(formatter, " ({method} {url}")?;
            if let Some(status) = self.status {
                write!(formatter, " -> {status}")?;
            }
            formatter.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_call_has_no_status() {
        let result = CallResult::rejected("container id is required");
        assert!(!result.is_ok());
        assert_eq!(result.kind(), ErrorKind::InvalidInput);
        assert_eq!(result.status(), None);
        assert!(result.finished_at().is_some());
        assert_eq!(result.message(), Some("container id is required"));
    }

    #[test]
    fn rejected_status_is_distinguishable_from_unreached_call() {
        let mut reached = CallResult::begin(Method::Get, "unix:///d.sock/v1.39/containers/x/json", None);
        reached.set_status(404);
        reached.set_response_body(String::from(r#"{"message":"No such container: x"}"#));
        reached.require_status(&[200]);
        reached.finish();

        let unreached = CallResult::rejected("id is blank");

        assert!(!reached.is_ok());
        assert_eq!(reached.status(), Some(404));
        assert_eq!(reached.kind(), ErrorKind::UnknownError);
        assert_eq!(reached.message(), Some("No such container: x"));
        assert!(!unreached.is_ok());
        assert_eq!(unreached.status(), None);
    }

    #[test]
    fn accepted_status_keeps_success() {
        let mut result = CallResult::begin(Method::Post, "http://h/v1.39/containers/x/stop", None);
        result.set_status(304);
        result.require_status(&[204, 304]);
        assert!(result.is_ok());
    }

    #[test]
    fn require_status_does_not_mask_transport_failures() {
        let mut result = CallResult::begin(Method::Get, "http://h/v1.39/_ping", None);
        result.fail(ErrorKind::ConnectionFailed, "connection refused");
        result.require_status(&[200]);
        assert_eq!(result.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(result.status(), None);
    }

    #[test]
    fn unknown_status_without_json_body_reports_code() {
        let mut result = CallResult::begin(Method::Get, "http://h/v1.39/info", None);
        result.set_status(500);
        result.set_response_body(String::from("boom"));
        result.require_status(&[200]);
        assert_eq!(result.message(), Some("unexpected HTTP status 500"));
    }

    #[test]
    fn display_includes_request_and_status() {
        let mut result = CallResult::begin(Method::Delete, "http://h/v1.39/volumes/data", None);
        result.set_status(409);
        result.require_status(&[204]);
        let rendered = result.to_string();
        assert!(rendered.starts_with("unknown error"), "{rendered}");
        assert!(rendered.contains("DELETE http://h/v1.39/volumes/data -> 409"), "{rendered}");
    }

    #[test]
    fn duration_is_available_once_finished() {
        let mut result = CallResult::begin(Method::Get, "http://h/v1.39/version", None);
        assert!(result.duration().is_none());
        result.finish();
        assert!(result.duration().is_some());
    }
}
