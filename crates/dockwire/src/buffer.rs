//! Append-only accumulator for response bytes.

use std::borrow::Cow;
use std::collections::TryReserveError;
use std::str::Utf8Error;

use thiserror::Error;

/// Raised when the buffer cannot grow to hold another chunk.
#[derive(Debug, Error)]
#[error("failed to grow response buffer by {requested} bytes: {source}")]
pub struct AllocError {
    requested: usize,
    #[source]
    source: TryReserveError,
}

impl AllocError {
    pub(crate) const fn new(requested: usize, source: TryReserveError) -> Self {
        Self { requested, source }
    }
}

/// Bytes received for one call, independent of how the network chunked them.
///
/// Growth is fallible: when the allocator refuses, the bytes already held stay
/// intact and the error is returned instead of aborting the process.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Appends a chunk after everything received so far.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when the allocator refuses to grow the buffer;
    /// the existing content is left untouched.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), AllocError> {
        self.bytes
            .try_reserve(chunk.len())
            .map_err(|source| AllocError::new(chunk.len(), source))?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    /// Number of accumulated bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been received yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Accumulated bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Accumulated bytes as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Utf8Error`] while the buffer ends inside a multi-byte
    /// sequence or holds invalid UTF-8.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    /// Accumulated bytes as text, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Drops a prefix that has already been dispatched.
    ///
    /// Counts larger than the buffer empty it.
    pub fn consume(&mut self, count: usize) {
        let dispatched = count.min(self.bytes.len());
        self.bytes.drain(..dispatched);
    }

    /// Releases the buffer, returning its contents as text.
    #[must_use]
    pub fn into_string_lossy(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(text) => text,
            Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_preserve_previous_content() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(b"{\"Id\":").expect("append");
        buffer.append(b"").expect("append empty");
        buffer.append(b"\"abc\"}").expect("append");
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.as_str().expect("utf8"), "{\"Id\":\"abc\"}");
    }

    #[test]
    fn utf8_split_across_chunks_is_reassembled() {
        let text = "caf\u{e9}";
        let bytes = text.as_bytes();
        let mut buffer = ResponseBuffer::new();
        buffer.append(&bytes[..4]).expect("append");
        assert!(buffer.as_str().is_err());
        buffer.append(&bytes[4..]).expect("append");
        assert_eq!(buffer.as_str().expect("utf8"), text);
    }

    #[test]
    fn consume_drops_prefix_only() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(b"{}\n{\"a\":1}").expect("append");
        buffer.consume(3);
        assert_eq!(buffer.as_bytes(), b"{\"a\":1}");
        buffer.consume(100);
        assert!(buffer.is_empty());
    }

    #[test]
    fn lossy_conversion_replaces_invalid_bytes() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(&[b'o', b'k', 0xff]).expect("append");
        assert_eq!(buffer.to_string_lossy(), "ok\u{fffd}");
        assert_eq!(buffer.into_string_lossy(), "ok\u{fffd}");
    }
}
