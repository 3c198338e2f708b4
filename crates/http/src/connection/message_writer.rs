use crate::codec::MessageEncoder;
use crate::protocol::body::BodyReader;
use crate::protocol::{Message, MessageHead, PayloadItem, PayloadSize, RequestHead, ResponseHead, SendError};
use bytes::{Buf, Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

/// Initial capacity of the write buffer
const WRITE_BUFFER_SIZE: usize = 8 * 1024;

pub type RequestWriter<W> = MessageWriter<W, RequestHead>;

pub type ResponseWriter<W> = MessageWriter<W, ResponseHead>;

/// Writes messages to a byte stream through a [`MessageEncoder`].
#[derive(Debug)]
pub struct MessageWriter<W, H> {
    writer: W,
    buffer: BytesMut,
    encoder: MessageEncoder<H>,
    written: u64,
}

impl<W, H> MessageWriter<W, H>
where
    W: AsyncWrite + Unpin,
    H: MessageHead,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, WRITE_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: MessageEncoder::new(), written: 0 }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Bytes handed to the underlying stream so far.
    ///
    /// Once this is non-zero the peer may have seen part of a message, so nothing else can be
    /// written in its place.
    pub fn written(&self) -> u64 {
        self.written
    }

    #[inline]
    pub fn write<D>(&mut self, item: Message<(H, PayloadSize), D>) -> Result<(), SendError>
    where
        D: Buf,
    {
        self.encoder.encode(item, &mut self.buffer)
    }

    #[inline]
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.written += self.buffer.len() as u64;
        let result = self.writer.write_all(self.buffer.as_ref()).await;
        self.buffer.clear();
        result?;
        Ok(self.writer.flush().await?)
    }

    /// Writes a whole message: hop-by-hop normalization, start line, headers, empty line, then
    /// the body framed to match the headers, then a flush.
    ///
    /// The head goes out before the first body chunk is awaited, so a streamed body reaches the
    /// peer as it arrives. A body error after that point is returned as [`SendError::Body`] and
    /// leaves a partial message on the stream.
    pub async fn write_message(&mut self, mut head: H, body: BodyReader) -> Result<(), SendError> {
        head.headers_mut().normalize_hop_by_hop();
        let (payload_size, mut body) = frame_body(&mut head, body).await?;

        self.write(Message::<_, Bytes>::Header((head, payload_size)))?;
        self.flush().await?;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            trace!(len = chunk.len(), "write body chunk");
            self.write(Message::<(H, PayloadSize)>::from(chunk))?;
            self.flush().await?;
        }

        self.write(Message::<(H, PayloadSize)>::Payload(PayloadItem::Eof))?;
        self.flush().await
    }
}

/// Makes the framing headers of `head` agree with the body about to be written.
///
/// - an empty body leaves the headers alone, a bodyless message keeps its informational ones
/// - a chunked head streams the body chunked and loses any `Content-Length`
/// - a known length is written as `Content-Length`
/// - an unknown length without chunked framing is buffered to learn it
async fn frame_body<H: MessageHead>(head: &mut H, body: BodyReader) -> Result<(PayloadSize, BodyReader), SendError> {
    let headers = head.headers_mut();

    match body.payload_size() {
        PayloadSize::Empty => Ok((PayloadSize::Empty, body)),

        _ if headers.is_chunked() => {
            headers.delete("Content-Length");
            Ok((PayloadSize::Chunked, body))
        }

        PayloadSize::Length(length) => {
            headers.set("Content-Length", length.to_string());
            Ok((PayloadSize::Length(length), body))
        }

        PayloadSize::Chunked => {
            let bytes = body.read_to_end().await?;
            trace!(len = bytes.len(), "buffered body of unknown length");

            headers.set("Content-Length", bytes.len().to_string());
            let payload_size = if bytes.is_empty() { PayloadSize::Empty } else { PayloadSize::Length(bytes.len() as u64) };
            Ok((payload_size, BodyReader::full(bytes)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::pipe;
    use crate::protocol::{BodyError, Headers};
    use http::{Method, StatusCode, Version};

    fn response(headers: &[(&str, &str)]) -> ResponseHead {
        ResponseHead::canonical(Version::HTTP_11, StatusCode::OK).with_headers(headers.iter().copied().collect::<Headers>())
    }

    async fn write(head: ResponseHead, body: BodyReader) -> (Result<(), SendError>, String) {
        let mut writer = ResponseWriter::new(Vec::new());
        let result = writer.write_message(head, body).await;
        (result, String::from_utf8(writer.into_inner()).unwrap())
    }

    #[tokio::test]
    async fn fixed_length_is_recomputed() {
        let (result, wire) = write(response(&[("Content-Length", "999"), ("Server", "x")]), BodyReader::full("hello")).await;

        result.unwrap();
        assert_eq!(wire, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nServer: x\r\nConnection: close\r\n\r\nhello");
    }

    #[tokio::test]
    async fn chunked_head_streams_chunks() {
        let (mut producer, body) = pipe(PayloadSize::Chunked);
        tokio::spawn(async move {
            producer.write(Bytes::from_static(b"hello ")).await.unwrap();
            producer.write(Bytes::from_static(b"world")).await.unwrap();
            producer.close();
        });

        let head = response(&[("Transfer-Encoding", "chunked"), ("Content-Length", "11")]);
        let (result, wire) = write(head, body).await;

        result.unwrap();
        assert_eq!(
            wire,
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n6\r\nhello \r\n5\r\nworld\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn unknown_length_is_buffered() {
        let (mut producer, body) = pipe(PayloadSize::Chunked);
        tokio::spawn(async move {
            producer.write(Bytes::from_static(b"abc")).await.unwrap();
            producer.write(Bytes::from_static(b"de")).await.unwrap();
            producer.close();
        });

        let (result, wire) = write(response(&[]), body).await;

        result.unwrap();
        assert_eq!(wire, "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 5\r\n\r\nabcde");
    }

    #[tokio::test]
    async fn bodyless_head_keeps_headers() {
        let (result, wire) = write(response(&[("Content-Length", "1234")]), BodyReader::empty()).await;

        result.unwrap();
        assert_eq!(wire, "HTTP/1.1 200 OK\r\nContent-Length: 1234\r\nConnection: close\r\n\r\n");
    }

    #[tokio::test]
    async fn request_hop_by_hop_headers_are_dropped() {
        let headers: Headers =
            [("Host", "example.com"), ("Connection", "keep-alive, X-Hop"), ("X-Hop", "1"), ("Upgrade", "websocket")]
                .into_iter()
                .collect();
        let head = RequestHead::new(Method::GET, "/", Version::HTTP_11).with_headers(headers);

        let mut writer = RequestWriter::new(Vec::new());
        writer.write_message(head, BodyReader::empty()).await.unwrap();

        assert_eq!(writer.into_inner(), b"GET / HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n");
    }

    #[tokio::test]
    async fn body_error_after_head_is_reported() {
        let (mut producer, body) = pipe(PayloadSize::Length(10));
        tokio::spawn(async move {
            producer.write(Bytes::from_static(b"part")).await.unwrap();
            producer.close_with_error(BodyError::producer("origin reset"));
        });

        let mut writer = ResponseWriter::new(Vec::new());
        let result = writer.write_message(response(&[]), body).await;

        assert!(matches!(result, Err(SendError::Body { source: BodyError::Producer { .. } })));
        assert!(writer.written() > 0);
        assert!(String::from_utf8(writer.into_inner()).unwrap().ends_with("\r\n\r\npart"));
    }

    #[tokio::test]
    async fn buffering_failure_writes_nothing() {
        let (producer, body) = pipe(PayloadSize::Chunked);
        producer.close_with_error(BodyError::producer("origin reset"));

        let mut writer = ResponseWriter::new(Vec::new());
        let result = writer.write_message(response(&[]), body).await;

        assert!(matches!(result, Err(SendError::Body { .. })));
        assert_eq!(writer.written(), 0);
    }
}
