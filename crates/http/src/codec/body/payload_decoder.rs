//! Dispatches body decoding to the framing a message head announced.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for fixed-length, chunked and absent bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(0) | PayloadSize::Empty => PayloadDecoder::empty(),
            PayloadSize::Length(length) => PayloadDecoder::fix_length(length),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_payload_size() {
        assert!(PayloadDecoder::from(PayloadSize::Empty).is_empty());
        assert!(PayloadDecoder::from(PayloadSize::Length(0)).is_empty());
        assert!(PayloadDecoder::from(PayloadSize::Chunked).is_chunked());
        assert_eq!(PayloadDecoder::from(PayloadSize::Length(3)), PayloadDecoder::fix_length(3));
    }

    #[test]
    fn no_body_is_eof_immediately() {
        let mut buffer = BytesMut::from(&b"leftover"[..]);
        let item = PayloadDecoder::empty().decode(&mut buffer).unwrap().unwrap();
        assert!(item.is_eof());
        assert_eq!(&buffer[..], b"leftover");
    }
}
