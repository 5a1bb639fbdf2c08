//! One HTTP/1.1 exchange per connection, driven by hyper's client connection.
//!
//! Calls stay blocking: each exchange owns a current-thread runtime and
//! drives it with `block_on` whenever the caller wants the next body frame.
//! The connection task only makes progress inside those calls, so a consumer
//! that stops pulling leaves the socket idle until it is dropped.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::{Request, Response, header};
use hyper_util::rt::TokioIo;
use tokio::runtime::Runtime;
use tracing::debug;

use super::TransportError;
use super::connection::Connection;
use crate::call::{Method, RequestBody};

/// Upper bound on hyper's read buffer, which bounds the response head.
pub(crate) const MAX_BUF_BYTES: usize = 64 * 1024;
const USER_AGENT: &str = concat!("dockwire/", env!("CARGO_PKG_VERSION"));

/// Builds the request sent to the daemon.
///
/// `Connection: close` ends the exchange with the response; no `Expect`
/// header is ever sent.
pub(crate) fn build_request(
    host: &str,
    method: Method,
    target: &str,
    body: Option<&RequestBody>,
) -> Result<Request<Full<Bytes>>, TransportError> {
    let mut builder = Request::builder()
        .method(method.as_str())
        .uri(target)
        .header(header::HOST, host)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, "application/json")
        .header(header::CONNECTION, "close");

    match (body, method) {
        (Some(content), _) => {
            builder = builder
                .header(header::CONTENT_TYPE, content.content_type())
                .header(header::CONTENT_LENGTH, content.as_bytes().len());
        }
        (None, Method::Post) => builder = builder.header(header::CONTENT_LENGTH, 0_usize),
        (None, Method::Get | Method::Delete) => {}
    }
    let payload = body.map_or_else(Bytes::new, |content| Bytes::copy_from_slice(content.as_bytes()));

    builder
        .body(Full::new(payload))
        .map_err(|error| TransportError::InvalidRequest(error.to_string()))
}

/// Performs the handshake over `connection`, sends `request` and waits for
/// the response head. Interim `1xx` answers are skipped by hyper.
pub(crate) async fn send(
    connection: Connection,
    request: Request<Full<Bytes>>,
) -> Result<Response<Incoming>, TransportError> {
    let mut builder = http1::Builder::new();
    builder.max_buf_size(MAX_BUF_BYTES);
    let (mut sender, conn) = builder
        .handshake(TokioIo::new(connection))
        .await
        .map_err(classify_exchange_error)?;

    tokio::spawn(async move {
        if let Err(error) = conn.await {
            debug!(%error, "daemon connection ended");
        }
    });

    sender
        .send_request(request)
        .await
        .map_err(classify_exchange_error)
}

/// Maps a failure before the response head arrived.
fn classify_exchange_error(error: hyper::Error) -> TransportError {
    if error.is_parse_too_large() {
        TransportError::HeadTooLarge(MAX_BUF_BYTES)
    } else if error.is_parse() || error.is_parse_status() {
        TransportError::MalformedResponse(error.to_string())
    } else if error.is_incomplete_message() {
        TransportError::ClosedBeforeResponse
    } else {
        TransportError::Exchange(error)
    }
}

/// Body of a response together with the runtime that drives its connection.
///
/// Dropping it closes the connection. Fields drop in order, so the body goes
/// before the runtime that owns the connection task.
pub(crate) struct ResponseBody {
    incoming: Incoming,
    runtime: Runtime,
    finished: bool,
}

impl ResponseBody {
    pub(crate) const fn new(runtime: Runtime, incoming: Incoming) -> Self {
        Self {
            incoming,
            runtime,
            finished: false,
        }
    }

    /// Next non-empty data frame, or `None` once the body has ended.
    ///
    /// Trailers are ignored. After an error the body reports its end.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        while !self.finished {
            match self.runtime.block_on(self.incoming.frame()) {
                None => self.finished = true,
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data()
                        && !data.is_empty()
                    {
                        return Ok(Some(data));
                    }
                }
                Some(Err(error)) => {
                    self.finished = true;
                    return Err(TransportError::Body(error));
                }
            }
        }
        Ok(None)
    }
}
