use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a body that must add up to exactly the announced `Content-Length`.
///
/// Overrunning the length or ending short is an error: the peer would otherwise misframe
/// whatever follows on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    return Err(SendError::invalid_body(format!(
                        "body exceeds Content-Length by {} bytes",
                        len - self.remaining
                    )));
                }

                dst.reserve(bytes.remaining());
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let chunk_len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(chunk_len);
                }
                self.remaining -= len;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.remaining > 0 {
                    return Err(SendError::invalid_body(format!(
                        "body ended {} bytes short of Content-Length",
                        self.remaining
                    )));
                }
                self.eof = true;
                Ok(())
            }
        }
    }
}
