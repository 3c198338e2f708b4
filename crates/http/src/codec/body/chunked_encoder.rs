use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use std::io::Write;

use crate::codec::FastWrite;
use tokio_util::codec::Encoder;

/// Frames each chunk as `hex(len) CRLF data CRLF` and closes the body with `0 CRLF CRLF`.
///
/// Empty chunks are skipped since a zero-size segment would end the body early. No trailers
/// are ever written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(FastWrite(dst), "{:x}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(len);
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::body::chunked_decoder::ChunkedDecoder;
    use bytes::Bytes;
    use tokio_util::codec::Decoder;

    #[test]
    fn frames_chunks_in_lowercase_hex() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from(vec![b'x'; 26])), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hi")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        let expected = format!("1a\r\n{}\r\n2\r\nhi\r\n0\r\n\r\n", "x".repeat(26));
        assert_eq!(&dst[..], expected.as_bytes());
        assert!(encoder.is_finish());
    }

    #[test]
    fn empty_body_is_only_the_terminator() {
        let mut dst = BytesMut::new();
        ChunkedEncoder::new().encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"0\r\n\r\n");
    }

    fn round_trip(payload: &[u8], piece_size: usize) {
        let mut wire = BytesMut::new();
        let mut encoder = ChunkedEncoder::new();
        for piece in payload.chunks(piece_size) {
            encoder.encode(PayloadItem::Chunk(Bytes::copy_from_slice(piece)), &mut wire).unwrap();
        }
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut wire).unwrap();

        let mut decoder = ChunkedDecoder::new();
        let mut decoded = Vec::with_capacity(payload.len());
        loop {
            match decoder.decode(&mut wire).unwrap() {
                Some(PayloadItem::Chunk(bytes)) => decoded.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => break,
                None => panic!("encoded body was incomplete"),
            }
        }

        assert_eq!(decoded.len(), payload.len(), "piece size {piece_size}");
        assert!(decoded == payload, "piece size {piece_size}");
        assert!(wire.is_empty());
    }

    #[test]
    fn decoder_reproduces_encoded_payloads() {
        let payloads: Vec<Vec<u8>> = vec![
            vec![],
            b"a".to_vec(),
            (0..=255u8).collect(),
            vec![b'\n'; 64 * 1024 + 1],
            vec![b'z'; 4 * 1024 * 1024],
            vec![b'\r'; 4 * 1024 * 1024 + 1],
        ];

        for payload in &payloads {
            for piece_size in [1, 64 * 1024, 4 * 1024 * 1024] {
                // one-byte pieces stop at 64 KiB
                if piece_size == 1 && payload.len() > 64 * 1024 + 1 {
                    continue;
                }
                round_trip(payload, piece_size);
            }
        }
    }
}
