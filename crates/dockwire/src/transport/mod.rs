//! Transport executor: one blocking HTTP exchange per call.
//!
//! The executor never interprets HTTP status codes. A 404 from the daemon is a
//! completed exchange and is recorded as such; resource operations decide
//! which statuses they accept.

mod connection;
mod http;

use std::io;

use thiserror::Error;
use tracing::debug;

use crate::buffer::{AllocError, ResponseBuffer};
use crate::call::Call;
use crate::descriptor::ConnectionDescriptor;
use crate::result::{CallResult, ErrorKind};

pub(crate) use http::ResponseBody;

/// Failures raised while exchanging bytes with the daemon.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The per-call runtime could not be started.
    #[error("failed to start the I/O runtime: {0}")]
    Runtime(#[source] io::Error),
    /// Host name resolution failed.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Underlying resolver failure.
        #[source]
        source: io::Error,
    },
    /// The socket could not be connected.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint being connected.
        endpoint: String,
        /// Underlying socket failure.
        #[source]
        source: io::Error,
    },
    /// The TLS session could not be configured.
    #[error("failed to set up TLS for {endpoint}: {source}")]
    Tls {
        /// Host the session targets.
        endpoint: String,
        /// Underlying TLS failure.
        #[source]
        source: rustls::Error,
    },
    /// The TLS handshake failed.
    #[error("TLS handshake with {endpoint} failed: {source}")]
    Handshake {
        /// Host the session targets.
        endpoint: String,
        /// Underlying I/O or certificate failure.
        #[source]
        source: io::Error,
    },
    /// The host is not usable as a TLS server name.
    #[error("'{0}' is not a valid TLS server name")]
    InvalidServerName(String),
    /// Unix sockets are not available on this platform.
    #[error("unix sockets are not supported on this platform: {0}")]
    UnsupportedUnixTransport(String),
    /// The request could not be expressed as HTTP.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Sending the request or awaiting the response failed.
    #[error("HTTP exchange failed: {0}")]
    Exchange(#[source] hyper::Error),
    /// The daemon closed the connection without answering.
    #[error("connection closed before a response was received")]
    ClosedBeforeResponse,
    /// The response head exceeded the size limit.
    #[error("response head exceeds {0} bytes")]
    HeadTooLarge(usize),
    /// The daemon's answer was not valid HTTP.
    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),
    /// The connection broke while the body was streaming.
    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),
    /// The response buffer could not grow.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

impl TransportError {
    /// Outcome classification recorded in the [`CallResult`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedResponse(_) | Self::HeadTooLarge(_) => ErrorKind::UnknownError,
            Self::InvalidRequest(_) => ErrorKind::InvalidInput,
            Self::Alloc(_) => ErrorKind::AllocFailed,
            Self::Runtime(_)
            | Self::Resolve { .. }
            | Self::Connect { .. }
            | Self::Tls { .. }
            | Self::Handshake { .. }
            | Self::InvalidServerName(_)
            | Self::UnsupportedUnixTransport(_)
            | Self::Exchange(_)
            | Self::ClosedBeforeResponse
            | Self::Body(_) => ErrorKind::ConnectionFailed,
        }
    }
}

/// A call after its request was sent.
///
/// `body` is present only when the response head arrived; otherwise `result`
/// already records the failure.
pub(crate) struct Exchange {
    pub(crate) result: CallResult,
    pub(crate) body: Option<ResponseBody>,
}

/// Validates, connects, sends the request and reads the response head.
pub(crate) fn send(descriptor: &ConnectionDescriptor, call: &Call) -> Exchange {
    if let Err(error) = call.validate() {
        let result = CallResult::rejected(error.to_string());
        result.log();
        return Exchange { result, body: None };
    }

    let target = call.target(descriptor.api_version());
    let url = descriptor.url_for(&target);
    let request_text = call.body().and_then(|body| body.text()).map(str::to_owned);
    let mut result = CallResult::begin(call.method(), url, request_text);
    debug!(method = %call.method(), url = result.url().unwrap_or_default(), "sending docker call");

    match open(descriptor, call, &target) {
        Ok((status, body)) => {
            result.set_status(status);
            Exchange {
                result,
                body: Some(body),
            }
        }
        Err(error) => {
            result.fail(error.kind(), error.to_string());
            result.log();
            Exchange { result, body: None }
        }
    }
}

fn open(
    descriptor: &ConnectionDescriptor,
    call: &Call,
    target: &str,
) -> Result<(u16, ResponseBody), TransportError> {
    let endpoint = descriptor.endpoint();
    let request = http::build_request(
        &connection::host_header(endpoint),
        call.method(),
        &descriptor.request_path(target),
        call.body(),
    )?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(TransportError::Runtime)?;
    let response = runtime.block_on(async {
        let connection = connection::connect(endpoint).await?;
        http::send(connection, request).await
    })?;

    let status = response.status().as_u16();
    Ok((status, ResponseBody::new(runtime, response.into_body())))
}

/// Runs a call to completion, buffering the whole response body.
pub(crate) fn execute(descriptor: &ConnectionDescriptor, call: &Call) -> CallResult {
    let Exchange { mut result, body: received } = send(descriptor, call);
    let Some(mut body) = received else {
        return result;
    };

    let mut buffer = ResponseBuffer::new();
    if let Err(error) = drain(&mut body, &mut buffer) {
        result.fail(error.kind(), error.to_string());
    }
    result.set_response_body(buffer.into_string_lossy());
    result.finish();
    result.log();
    result
}

/// Appends every chunk of `body` to `buffer` until the body ends.
///
/// # Errors
///
/// Returns the transport failure that cut the body short, or
/// [`TransportError::Alloc`] when the buffer cannot grow. Bytes received
/// before the failure stay in `buffer`.
pub(crate) fn drain(body: &mut ResponseBody, buffer: &mut ResponseBuffer) -> Result<(), TransportError> {
    while let Some(chunk) = body.next_chunk()? {
        buffer.append(&chunk)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_map_to_connection_failed() {
        let error = TransportError::Connect {
            endpoint: String::from("unix:///missing.sock"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(error.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn malformed_heads_map_to_unknown_error() {
        let error = TransportError::MalformedResponse(String::from("invalid status"));
        assert_eq!(error.kind(), ErrorKind::UnknownError);
        assert_eq!(TransportError::HeadTooLarge(http::MAX_BUF_BYTES).kind(), ErrorKind::UnknownError);
    }

    #[test]
    fn allocation_failures_map_to_alloc_failed() {
        let source = Vec::<u8>::new()
            .try_reserve(usize::MAX)
            .expect_err("reserving usize::MAX bytes cannot succeed");
        let error = TransportError::from(AllocError::new(usize::MAX, source));
        assert_eq!(error.kind(), ErrorKind::AllocFailed);
    }
}
