use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeadEncoder;
use crate::protocol::{Message, MessageHead, PayloadSize, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes a message head followed by its payload items.
///
/// The body is framed by the [`PayloadSize`] given with the head; the head's own framing
/// headers are expected to agree with it already.
#[derive(Debug)]
pub struct MessageEncoder<H> {
    head_encoder: HeadEncoder<H>,
    payload_encoder: Option<PayloadEncoder>,
}

impl<H> MessageEncoder<H> {
    pub fn new() -> Self {
        Self { head_encoder: HeadEncoder::new(), payload_encoder: None }
    }
}

impl<H> Default for MessageEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MessageHead, D: Buf> Encoder<Message<(H, PayloadSize), D>> for MessageEncoder<H> {
    type Error = SendError;

    fn encode(&mut self, item: Message<(H, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive message head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload_encoder = Some(payload_size.into());
                self.head_encoder.encode(&head, dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PayloadItem, ResponseHead};
    use bytes::Bytes;
    use http::{StatusCode, Version};

    fn head() -> ResponseHead {
        ResponseHead::canonical(Version::HTTP_11, StatusCode::OK)
            .with_headers([("Transfer-Encoding", "chunked")].into_iter().collect())
    }

    #[test]
    fn head_then_chunked_payload() {
        let mut encoder = MessageEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head(), PayloadSize::Chunked)), &mut dst).unwrap();
        encoder.encode(Message::<(ResponseHead, PayloadSize)>::from(Bytes::from_static(b"hello")), &mut dst).unwrap();
        encoder.encode(Message::<(ResponseHead, PayloadSize)>::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n");
    }

    #[test]
    fn next_head_after_eof() {
        let mut encoder = MessageEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head(), PayloadSize::Empty)), &mut dst).unwrap();
        encoder.encode(Message::<(ResponseHead, PayloadSize)>::Payload(PayloadItem::Eof), &mut dst).unwrap();
        assert!(encoder.encode(Message::<_, Bytes>::Header((head(), PayloadSize::Empty)), &mut dst).is_ok());
    }

    #[test]
    fn payload_before_head_is_rejected() {
        let mut encoder = MessageEncoder::<ResponseHead>::new();
        let result = encoder.encode(Message::<(ResponseHead, PayloadSize)>::from(Bytes::from_static(b"x")), &mut BytesMut::new());
        assert!(matches!(result, Err(SendError::Io { .. })));
    }
}
