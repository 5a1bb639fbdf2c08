//! Incremental splitting of a response body into JSON documents.
//!
//! Streaming endpoints use one of three framings. System events are newline
//! delimited. Image pull and build progress, like container stats, are written
//! back to back with nothing in between, so boundaries are found by tracking
//! brace and bracket depth outside of string literals. Container logs arrive
//! in the daemon's multiplexed format: an 8-byte header `[stream, 0, 0, 0,
//! length as big-endian u32]` in front of every payload. Each payload becomes
//! a `{"stream": ..., "text": ...}` document.
//!
//! [`scan`] is the pure core: given the cursor left by the previous call and
//! the whole accumulated buffer, it examines only the bytes it has not seen
//! yet and returns the documents that were completed. [`Dispatcher`] wraps it
//! with a [`ResponseBuffer`] and drops dispatched prefixes as it goes.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::buffer::{AllocError, ResponseBuffer};

/// How an endpoint delimits the documents in its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One document per `\n`-terminated line.
    Lines,
    /// Documents written back to back without a separator.
    Concatenated,
    /// Log payloads behind 8-byte stream headers.
    Multiplexed,
}

/// Size of the header in front of every multiplexed payload.
pub const MULTIPLEX_HEADER_LEN: usize = 8;

/// Progress of the scanner through a growing buffer.
///
/// Offsets index into the buffer handed to [`scan`]. Bytes before `consumed`
/// belong to documents already emitted (or discarded); bytes before `scanned`
/// have been examined and are never examined again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCursor {
    consumed: usize,
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    passthrough: bool,
}

impl StreamCursor {
    /// Cursor positioned at the start of an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            consumed: 0,
            scanned: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            passthrough: false,
        }
    }

    /// Offset up to which bytes have been emitted or discarded.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Offset up to which bytes have been examined.
    #[must_use]
    pub const fn scanned(&self) -> usize {
        self.scanned
    }

    /// Current brace/bracket nesting depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the scanner sits inside a string literal.
    #[must_use]
    pub const fn in_string(&self) -> bool {
        self.in_string
    }

    /// Whether a multiplexed body turned out to be raw text, as sent for
    /// containers with a TTY.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Shifts the offsets after `count` leading bytes were removed from the
    /// buffer. Counts beyond [`Self::consumed`] are clamped.
    pub fn rebase(&mut self, count: usize) {
        let removed = count.min(self.consumed);
        self.consumed -= removed;
        self.scanned -= removed;
    }
}

/// Observable phase of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing is buffered.
    AwaitingBytes,
    /// A partial document is buffered.
    Scanning,
    /// The last chunk completed at least one document.
    DocumentEmitted,
    /// End of stream was processed; no further input is accepted.
    StreamClosed,
}

/// Scans the unexamined suffix of `buffer` and returns the completed
/// documents in arrival order.
///
/// Complete fragments that are not valid JSON are skipped with a warning.
#[must_use]
pub fn scan(framing: Framing, cursor: StreamCursor, buffer: &[u8]) -> (StreamCursor, Vec<Value>) {
    let mut documents = Vec::new();
    let advanced = match framing {
        Framing::Lines => scan_lines(cursor, buffer, &mut documents),
        Framing::Concatenated => scan_concatenated(cursor, buffer, &mut documents),
        Framing::Multiplexed => scan_multiplexed(cursor, buffer, &mut documents),
    };
    (advanced, documents)
}

/// Handles end of stream: a trailing remainder is parsed once and otherwise
/// discarded with a warning.
///
/// For [`Framing::Multiplexed`] a remainder that cannot start a frame is
/// returned as raw text; a truncated frame is discarded.
#[must_use]
pub fn finish(framing: Framing, cursor: StreamCursor, buffer: &[u8]) -> Option<Value> {
    let tail = buffer.get(cursor.consumed..).unwrap_or_default();
    if framing == Framing::Multiplexed {
        return finish_multiplexed(cursor, tail);
    }
    let remainder = tail.trim_ascii();
    if remainder.is_empty() {
        return None;
    }
    match serde_json::from_slice(remainder) {
        Ok(document) => Some(document),
        Err(error) => {
            warn!(
                ?framing,
                bytes = remainder.len(),
                %error,
                "discarding incomplete data at end of stream"
            );
            None
        }
    }
}

fn finish_multiplexed(cursor: StreamCursor, tail: &[u8]) -> Option<Value> {
    if tail.is_empty() {
        return None;
    }
    if cursor.passthrough || !starts_frame(tail) {
        return Some(output_document("raw", tail));
    }
    warn!(bytes = tail.len(), "discarding truncated log frame at end of stream");
    None
}

fn scan_lines(mut cursor: StreamCursor, buffer: &[u8], documents: &mut Vec<Value>) -> StreamCursor {
    let mut offset = cursor.scanned.min(buffer.len());
    while let Some(position) = buffer
        .get(offset..)
        .and_then(|unseen| unseen.iter().position(|byte| *byte == b'\n'))
    {
        let end = offset + position;
        emit_fragment(buffer.get(cursor.consumed..end).unwrap_or_default(), documents);
        cursor.consumed = end + 1;
        offset = end + 1;
    }
    cursor.scanned = buffer.len();
    cursor
}

fn scan_concatenated(
    mut cursor: StreamCursor,
    buffer: &[u8],
    documents: &mut Vec<Value>,
) -> StreamCursor {
    for (index, &byte) in buffer.iter().enumerate().skip(cursor.scanned) {
        if cursor.depth == 0 {
            match byte {
                b'{' | b'[' => {
                    discard_stray(buffer.get(cursor.consumed..index).unwrap_or_default());
                    cursor.consumed = index;
                    cursor.depth = 1;
                }
                _ if byte.is_ascii_whitespace() && cursor.consumed == index => {
                    cursor.consumed = index + 1;
                }
                _ => {}
            }
            continue;
        }

        if cursor.in_string {
            if cursor.escaped {
                cursor.escaped = false;
            } else if byte == b'\\' {
                cursor.escaped = true;
            } else if byte == b'"' {
                cursor.in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => cursor.in_string = true,
            b'{' | b'[' => cursor.depth += 1,
            b'}' | b']' => {
                cursor.depth -= 1;
                if cursor.depth == 0 {
                    emit_fragment(buffer.get(cursor.consumed..=index).unwrap_or_default(), documents);
                    cursor.consumed = index + 1;
                }
            }
            _ => {}
        }
    }
    cursor.scanned = buffer.len();
    cursor
}

fn scan_multiplexed(
    mut cursor: StreamCursor,
    buffer: &[u8],
    documents: &mut Vec<Value>,
) -> StreamCursor {
    loop {
        let rest = buffer.get(cursor.consumed..).unwrap_or_default();
        if cursor.passthrough {
            let complete = complete_utf8_prefix(rest);
            if complete > 0 {
                documents.push(output_document("raw", rest.get(..complete).unwrap_or_default()));
                cursor.consumed += complete;
            }
            break;
        }
        if !starts_frame(rest) {
            debug!("log body carries no stream headers, passing it through as text");
            cursor.passthrough = true;
            continue;
        }
        let Some((stream, payload)) = next_frame(rest) else {
            break;
        };
        if !payload.is_empty() {
            documents.push(output_document(stream, payload));
        }
        cursor.consumed += MULTIPLEX_HEADER_LEN + payload.len();
    }
    cursor.scanned = buffer.len();
    cursor
}

/// Whether `bytes` can begin a frame header, judging only the bytes present.
fn starts_frame(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(4)
        .enumerate()
        .all(|(index, &byte)| if index == 0 { byte <= 2 } else { byte == 0 })
}

/// Splits off one complete frame, returning its stream name and payload.
fn next_frame(bytes: &[u8]) -> Option<(&'static str, &[u8])> {
    let header = bytes.get(..MULTIPLEX_HEADER_LEN)?;
    let stream = match header.first()? {
        0 => "stdin",
        1 => "stdout",
        _ => "stderr",
    };
    let length = header
        .get(4..)?
        .iter()
        .fold(0_usize, |length, &byte| (length << 8) | usize::from(byte));
    let end = MULTIPLEX_HEADER_LEN.checked_add(length)?;
    bytes.get(MULTIPLEX_HEADER_LEN..end).map(|payload| (stream, payload))
}

/// Length of the longest prefix that does not end inside a UTF-8 sequence.
fn complete_utf8_prefix(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Err(error) if error.error_len().is_none() => error.valid_up_to(),
        _ => bytes.len(),
    }
}

fn output_document(stream: &str, payload: &[u8]) -> Value {
    json!({ "stream": stream, "text": String::from_utf8_lossy(payload) })
}

fn emit_fragment(fragment: &[u8], documents: &mut Vec<Value>) {
    let trimmed = fragment.trim_ascii();
    if trimmed.is_empty() {
        return;
    }
    match serde_json::from_slice(trimmed) {
        Ok(document) => documents.push(document),
        Err(error) => warn!(
            bytes = trimmed.len(),
            %error,
            "skipping malformed streamed document"
        ),
    }
}

fn discard_stray(bytes: &[u8]) {
    let trimmed = bytes.trim_ascii();
    if !trimmed.is_empty() {
        warn!(bytes = trimmed.len(), "discarding bytes outside any JSON document");
    }
}

/// Stateful wrapper pairing a [`ResponseBuffer`] with a [`StreamCursor`].
///
/// Dispatched bytes are dropped from the buffer after every chunk, so an
/// unbounded subscription only holds the partial document in flight.
#[derive(Debug)]
pub struct Dispatcher {
    framing: Framing,
    cursor: StreamCursor,
    buffer: ResponseBuffer,
    state: StreamState,
}

impl Dispatcher {
    /// Creates a dispatcher for the given framing.
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            cursor: StreamCursor::new(),
            buffer: ResponseBuffer::new(),
            state: StreamState::AwaitingBytes,
        }
    }

    /// Framing this dispatcher applies.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Bytes received but not yet part of an emitted document.
    #[must_use]
    pub const fn pending(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Appends a chunk and returns the documents it completed.
    ///
    /// Chunks pushed after [`Self::finish`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when the chunk cannot be buffered; documents
    /// completed by earlier chunks are unaffected.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>, AllocError> {
        if self.state == StreamState::StreamClosed {
            return Ok(Vec::new());
        }
        self.buffer.append(chunk)?;
        let (cursor, documents) = scan(self.framing, self.cursor, self.buffer.as_bytes());
        self.cursor = cursor;

        let consumed = self.cursor.consumed();
        if consumed > 0 {
            self.buffer.consume(consumed);
            self.cursor.rebase(consumed);
        }

        self.state = if !documents.is_empty() {
            StreamState::DocumentEmitted
        } else if self.buffer.is_empty() {
            StreamState::AwaitingBytes
        } else {
            StreamState::Scanning
        };
        Ok(documents)
    }

    /// Processes end of stream.
    ///
    /// A remainder that parses is returned and cleared; one that does not is
    /// kept in [`Self::pending`] for diagnostics.
    pub fn finish(&mut self) -> Option<Value> {
        if self.state == StreamState::StreamClosed {
            return None;
        }
        self.state = StreamState::StreamClosed;
        let document = finish(self.framing, self.cursor, self.buffer.as_bytes());
        if document.is_some() {
            self.buffer.consume(self.buffer.len());
            self.cursor = StreamCursor::new();
        }
        document
    }

    /// Releases the undispatched remainder.
    #[must_use]
    pub fn into_remainder(self) -> ResponseBuffer {
        self.buffer
    }
}
