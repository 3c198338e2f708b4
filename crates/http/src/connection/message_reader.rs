use bytes::BytesMut;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, trace};

use crate::codec::{MessageDecoder, ResponseDecoder};
use crate::protocol::body::{BodyReader, BodyWriter, pipe};
use crate::protocol::{Message, MessageHead, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead};

/// Initial capacity of the read buffer
const READ_BUFFER_SIZE: usize = 8 * 1024;

pub type RequestReader<R> = MessageReader<R, RequestHead>;

pub type ResponseReader<R> = MessageReader<R, ResponseHead>;

/// Reads one message off a byte stream.
///
/// [`read_head`](Self::read_head) returns as soon as the head is parsed; the body is then
/// streamed by [`into_body`](Self::into_body) so the caller can act on the head before the body
/// has arrived.
#[derive(Debug)]
pub struct MessageReader<R, H> {
    framed_read: FramedRead<R, MessageDecoder<H>>,
}

impl<R, H> MessageReader<R, H>
where
    R: AsyncRead + Unpin,
    H: MessageHead,
{
    pub fn new(reader: R) -> Self {
        Self::with_decoder(reader, MessageDecoder::new())
    }

    pub fn with_decoder(reader: R, decoder: MessageDecoder<H>) -> Self {
        Self { framed_read: FramedRead::with_capacity(reader, decoder, READ_BUFFER_SIZE) }
    }

    /// Reads the next head and the framing its body will use.
    ///
    /// A stream that ends before a complete head is [`ParseError::UnexpectedEof`].
    pub async fn read_head(&mut self) -> Result<(H, PayloadSize), ParseError> {
        match self.framed_read.next().await {
            Some(Ok(Message::Header(head))) => Ok(head),
            Some(Ok(Message::Payload(_))) => Err(ParseError::invalid_body("expect message head but receive payload item")),
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    /// Gives back the stream and whatever was read past the last decoded item.
    pub fn into_parts(self) -> (R, BytesMut) {
        let parts = self.framed_read.into_parts();
        (parts.io, parts.read_buf)
    }
}

impl<R> ResponseReader<R>
where
    R: AsyncRead + Unpin,
{
    /// A reader for the response to `request`, see [`ResponseDecoder::for_request`].
    pub fn for_request(reader: R, request: &RequestHead) -> Self {
        Self::with_decoder(reader, ResponseDecoder::for_request(request))
    }
}

impl<R, H> MessageReader<R, H>
where
    R: AsyncRead + Unpin + Send + 'static,
    H: MessageHead + Send + 'static,
{
    /// Streams the body announced by the last head through a conduit.
    ///
    /// A non-empty body is read by a spawned task. If the stream breaks or the body is malformed,
    /// the consumer sees that error after the bytes that did arrive.
    pub fn into_body(self, payload_size: PayloadSize) -> BodyReader {
        if payload_size.is_empty() {
            return BodyReader::empty();
        }

        let (writer, reader) = pipe(payload_size);
        tokio::spawn(pump_body(self.framed_read, writer));
        reader
    }
}

async fn pump_body<R, H>(mut framed_read: FramedRead<R, MessageDecoder<H>>, mut writer: BodyWriter)
where
    R: AsyncRead + Unpin,
    H: MessageHead,
{
    let mut received = 0usize;
    loop {
        match framed_read.next().await {
            Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                received += bytes.len();
                if writer.write(bytes).await.is_err() {
                    debug!(received, "body consumer went away, stop reading body");
                    return;
                }
            }
            Some(Ok(Message::Payload(PayloadItem::Eof))) => {
                trace!(received, "finished reading body");
                writer.close();
                return;
            }
            Some(Ok(Message::Header(_))) => {
                writer.close_with_error(ParseError::invalid_body("expect payload item but receive message head").into());
                return;
            }
            Some(Err(e)) => {
                debug!(received, cause = %e, "failed to read body");
                writer.close_with_error(e.into());
                return;
            }
            None => {
                debug!(received, "stream ended before the body was complete");
                writer.close_with_error(ParseError::UnexpectedEof.into());
                return;
            }
        }
    }
}
