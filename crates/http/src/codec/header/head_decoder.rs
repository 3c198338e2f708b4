//! Line-oriented decoder for request and response heads.
//!
//! The head is everything up to the first empty line. Lines end with CRLF or a bare LF. The
//! start line goes to [`MessageHead::parse_start_line`]; every following line must split on the
//! first `": "` into a key and a value, otherwise the head is rejected with
//! [`ParseError::InvalidHeaderLine`].
//!
//! # Limits
//!
//! - Maximum line length: 8KB
//! - Maximum head size: 64KB
//! - Maximum number of headers: 128

use std::marker::PhantomData;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{Headers, MessageHead, ParseError, PayloadSize};

/// Maximum length of a single head line, line terminator excluded
const MAX_LINE_BYTES: usize = 8 * 1024;

/// Maximum size in bytes allowed for the entire head
const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Maximum number of header lines in a head
const MAX_HEADER_NUM: usize = 128;

/// Decoder for message heads implementing the [`Decoder`] trait.
///
/// Nothing is consumed from the buffer until the whole head has arrived, so a partial head is
/// simply re-scanned on the next call.
#[derive(Debug)]
pub struct HeadDecoder<H> {
    _head: PhantomData<fn() -> H>,
}

impl<H> HeadDecoder<H> {
    pub fn new() -> Self {
        Self { _head: PhantomData }
    }
}

impl<H> Default for HeadDecoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MessageHead> Decoder for HeadDecoder<H> {
    type Item = (H, PayloadSize);
    type Error = ParseError;

    /// Returns the parsed head and the body framing its headers announce.
    ///
    /// The framing here is header-driven only; whether the message may carry a body at all is
    /// decided by the caller.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(head_len) = find_head_end(src)? else {
            ensure!(src.len() <= MAX_HEAD_BYTES, ParseError::too_large_head(src.len(), MAX_HEAD_BYTES));
            return Ok(None);
        };

        ensure!(head_len <= MAX_HEAD_BYTES, ParseError::too_large_head(head_len, MAX_HEAD_BYTES));
        trace!(head_size = head_len, "parsed head size");

        let head_bytes = src.split_to(head_len);
        let text = std::str::from_utf8(&head_bytes)
            .map_err(|e| ParseError::invalid_header_line(format!("head is not valid UTF-8: {e}")))?;

        let mut lines = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

        let start_line = lines.next().unwrap_or_default();
        let mut head = H::parse_start_line(start_line)?;

        let mut headers = Headers::with_capacity(16);
        for line in lines.take_while(|line| !line.is_empty()) {
            ensure!(headers.len() < MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));

            let (key, value) = line.split_once(": ").ok_or_else(|| ParseError::invalid_header_line(line))?;
            headers.append(key, value);
        }
        *head.headers_mut() = headers;

        let payload_size = payload_size(head.headers())?;
        Ok(Some((head, payload_size)))
    }
}

/// Finds the length of the head including its terminating empty line.
///
/// Fails as soon as any line, complete or not, exceeds [`MAX_LINE_BYTES`].
fn find_head_end(src: &[u8]) -> Result<Option<usize>, ParseError> {
    let mut line_start = 0;

    while let Some(offset) = src[line_start..].iter().position(|&b| b == b'\n') {
        let line_end = line_start + offset;
        let line = &src[line_start..line_end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        ensure!(line.len() <= MAX_LINE_BYTES, ParseError::too_long_line(MAX_LINE_BYTES));

        if line.is_empty() {
            return Ok(Some(line_end + 1));
        }
        line_start = line_end + 1;
    }

    ensure!(src.len() - line_start <= MAX_LINE_BYTES + 1, ParseError::too_long_line(MAX_LINE_BYTES));
    Ok(None)
}

/// Determines the body framing announced by `headers`.
///
/// Chunked transfer coding wins over `Content-Length`; without either the body is empty.
pub fn payload_size(headers: &Headers) -> Result<PayloadSize, ParseError> {
    if headers.is_chunked() {
        return Ok(PayloadSize::Chunked);
    }

    let Some(value) = headers.get("Content-Length") else {
        return Ok(PayloadSize::Empty);
    };

    let length = value.trim().parse::<u64>().map_err(|e| ParseError::invalid_content_length(format!("{value:?}: {e}")))?;

    Ok(if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) })
}
