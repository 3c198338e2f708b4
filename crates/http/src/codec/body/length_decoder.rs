//! Decoder for bodies framed by `Content-Length`.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out exactly `length` bytes, then `Eof`. Anything past that stays in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let take = cmp::min(self.length, src.len() as u64);
        self.length -= take;
        Ok(Some(PayloadItem::Chunk(src.split_to(take as usize).freeze())))
    }
}
