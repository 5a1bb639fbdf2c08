//! Thin resource operations layered on the call executor.
//!
//! Each operation declares the HTTP statuses it accepts. Any other status
//! turns the [`CallResult`] into [`ErrorKind::UnknownError`] while keeping the
//! status and the daemon's message, so callers can tell "not reached" from
//! "reached and refused".

mod containers;
mod images;
mod system;
mod volumes;

use std::fmt::Display;

use serde_json::Value;

use crate::result::{CallResult, ErrorKind};

pub use containers::{
    Containers, ListContainersOptions, LogsOptions, RemoveContainerOptions, WaitCondition,
};
pub use images::{BuildOptions, Images, ListImagesOptions, PullOptions};
pub use system::{EventsOptions, System};
pub use volumes::{CreateVolumeOptions, PruneVolumesOptions, Volumes};

/// Result of a resource operation together with its decoded payload.
///
/// `payload` is only present when `result.is_ok()`.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// Diagnostics for the call.
    pub result: CallResult,
    /// Decoded answer.
    pub payload: Option<T>,
}

impl<T> Outcome<T> {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok() && self.payload.is_some()
    }

    /// Splits into the payload or the failing result.
    ///
    /// # Errors
    ///
    /// Returns the [`CallResult`] when the call failed or produced no payload.
    pub fn into_payload(self) -> Result<T, Box<CallResult>> {
        match self.payload {
            Some(payload) if self.result.is_ok() => Ok(payload),
            _ => Err(Box::new(self.result)),
        }
    }

    /// Maps the payload, keeping the result.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            result: self.result,
            payload: self.payload.map(f),
        }
    }

    const fn failed(result: CallResult) -> Self {
        Self {
            result,
            payload: None,
        }
    }
}

pub(crate) fn rejected<T>(error: impl Display) -> Outcome<T> {
    let result = CallResult::rejected(error.to_string());
    result.log();
    Outcome::failed(result)
}

/// Accepts `statuses` and decodes the body as one JSON document.
pub(crate) fn expect_json(mut result: CallResult, accepted: &[u16]) -> Outcome<Value> {
    result.require_status(accepted);
    if !result.is_ok() {
        return Outcome::failed(result);
    }
    let Some(payload) = result.response_json() else {
        result.fail(ErrorKind::UnknownError, "response body is not a JSON document");
        result.log();
        return Outcome::failed(result);
    };
    Outcome {
        result,
        payload: Some(payload),
    }
}

/// Accepts `statuses` and ignores the body.
pub(crate) fn expect_empty(mut result: CallResult, accepted: &[u16]) -> Outcome<()> {
    result.require_status(accepted);
    let payload = result.is_ok().then_some(());
    Outcome { result, payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Method;

    fn answered(status: u16, body: &str) -> CallResult {
        let mut result = CallResult::begin(Method::Get, "unix:///d.sock/v1.39/info", None);
        result.set_status(status);
        result.set_response_body(body.to_owned());
        result.finish();
        result
    }

    #[test]
    fn json_payload_is_decoded_for_accepted_status() {
        let outcome = expect_json(answered(200, r#"{"ID":"abc"}"#), &[200]);
        assert!(outcome.is_ok());
        let payload = outcome.into_payload().expect("payload");
        assert_eq!(payload["ID"], "abc");
    }

    #[test]
    fn unexpected_status_keeps_status_and_message() {
        let outcome = expect_json(answered(404, r#"{"message":"no such container"}"#), &[200]);
        assert!(!outcome.is_ok());
        assert_eq!(outcome.result.status(), Some(404));
        assert_eq!(outcome.result.kind(), ErrorKind::UnknownError);
        assert_eq!(outcome.result.message(), Some("no such container"));
    }

    #[test]
    fn non_json_body_is_unknown_error() {
        let outcome = expect_json(answered(200, "<html>"), &[200]);
        assert_eq!(outcome.result.kind(), ErrorKind::UnknownError);
        assert!(outcome.payload.is_none());
    }

    #[test]
    fn benign_status_is_accepted() {
        let outcome = expect_empty(answered(304, ""), &[204, 304]);
        assert!(outcome.is_ok());
    }

    #[test]
    fn rejected_outcome_has_no_status() {
        let outcome: Outcome<()> = rejected("until is required");
        assert_eq!(outcome.result.kind(), ErrorKind::InvalidInput);
        assert_eq!(outcome.result.status(), None);
    }
}
