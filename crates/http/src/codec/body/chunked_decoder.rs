//! `Transfer-Encoding: chunked` bodies, decoded one state at a time.
//!
//! The wire format is a sequence of `hex-size [;ext] CRLF data CRLF` segments terminated by a
//! zero-size segment and an optional trailer block. Chunk extensions and trailer fields are read
//! and dropped; they are never forwarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

const INVALID_SIZE: &str = "can't parse chunk length";
const MORE_DATA: &str = "chunk has more data than expected";

/// Turns a chunked body back into plain payload bytes.
///
/// Chunk data is handed out as soon as it arrives, so one wire chunk may become several
/// [`PayloadItem::Chunk`]s when it is split across reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// First hex digit of the chunk size
    Size,
    /// Further hex digits of the chunk size
    SizeMore,
    /// Whitespace after the size
    SizeLws,
    /// Chunk extension, skipped
    Extension,
    /// LF closing the size line
    SizeLf,
    /// Chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// A trailer field, skipped
    Trailer,
    /// LF closing a trailer field
    TrailerLf,
    /// CR of the empty line ending the message, or the start of a trailer field
    EndCr,
    /// LF of the empty line ending the message
    EndLf,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(result) => result?,
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.has_remaining() {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

fn invalid(reason: &str) -> Poll<Result<ChunkedState, ParseError>> {
    Poll::Ready(Err(ParseError::invalid_body(reason)))
}

fn hex_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some(u64::from(b - b'0')),
        b'a'..=b'f' => Some(u64::from(b + 10 - b'a')),
        b'A'..=b'F' => Some(u64::from(b + 10 - b'A')),
        _ => None,
    }
}

impl ChunkedState {
    fn step(&self, src: &mut BytesMut, remaining_size: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeMore => ChunkedState::read_size_more(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src, *remaining_size),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, *remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailer => ChunkedState::read_trailer(src),
            TrailerLf => ChunkedState::read_trailer_lf(src),
            EndCr => ChunkedState::read_end_cr(src),
            EndLf => ChunkedState::read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// A size line must start with a hex digit.
    fn read_size(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        match hex_value(try_next_byte!(src)) {
            Some(value) => {
                *size_per_chunk = value;
                Poll::Ready(Ok(SizeMore))
            }
            None => invalid(INVALID_SIZE),
        }
    }

    fn read_size_more(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        let b = try_next_byte!(src);
        if let Some(value) = hex_value(b) {
            return match size_per_chunk.checked_mul(16).and_then(|size| size.checked_add(value)) {
                Some(size) => {
                    *size_per_chunk = size;
                    Poll::Ready(Ok(SizeMore))
                }
                None => invalid(INVALID_SIZE),
            };
        }

        match b {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Ok(after_size_line(*size_per_chunk))),
            _ => invalid(INVALID_SIZE),
        }
    }

    fn read_size_lws(src: &mut BytesMut, size_per_chunk: u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Ok(after_size_line(size_per_chunk))),
            _ => invalid(INVALID_SIZE),
        }
    }

    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        // extensions end at the next CRLF; a bare LF inside one is rejected
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => invalid("invalid chunk extension contains newline"),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size_per_chunk: u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(after_size_line(size_per_chunk))),
            _ => invalid(INVALID_SIZE),
        }
    }

    fn read_body(src: &mut BytesMut, size_per_chunk: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Pending;
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(*size_per_chunk).unwrap_or(usize::MAX);
        let read_size = std::cmp::min(remaining, src.len());

        *size_per_chunk -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if *size_per_chunk > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    /// Anything but the CRLF right after the declared size means the chunk was longer than announced.
    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            b'\n' => Poll::Ready(Ok(Size)),
            _ => invalid(MORE_DATA),
        }
    }

    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => invalid(MORE_DATA),
        }
    }

    fn read_trailer(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            b'\n' => Poll::Ready(Ok(EndCr)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_trailer_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(EndCr)),
            _ => invalid("invalid trailer end LF"),
        }
    }

    fn read_end_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            b'\n' => Poll::Ready(Ok(End)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_end_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(End)),
            _ => invalid("invalid chunk end LF"),
        }
    }
}

fn after_size_line(size_per_chunk: u64) -> ChunkedState {
    if size_per_chunk == 0 { EndCr } else { Body }
}
