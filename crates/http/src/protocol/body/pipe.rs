use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use tracing::trace;

use crate::protocol::{BodyError, PayloadSize};

/// Number of chunks a producer may run ahead of its consumer before `write` blocks.
const PIPE_BUFFER: usize = 8;

type Completion = Result<(), BodyError>;

/// Creates a conduit whose consumer end announces `payload_size` as its size hint.
///
/// The writer blocks once [`PIPE_BUFFER`] chunks are waiting, so a slow consumer throttles the
/// producer instead of the body piling up in memory. The producer finishes with
/// [`BodyWriter::close`] or [`BodyWriter::close_with_error`]; a writer dropped without either is
/// reported to the consumer as [`BodyError::Aborted`], never as a clean end of data.
pub fn pipe(payload_size: PayloadSize) -> (BodyWriter, BodyReader) {
    let (data_sender, data_receiver) = mpsc::channel(PIPE_BUFFER);
    let (done_sender, done_receiver) = oneshot::channel();

    let writer = BodyWriter { data: data_sender, done: done_sender };
    let reader = BodyReader { kind: Kind::Pipe { data: data_receiver, done: Some(done_receiver) }, size: payload_size };
    (writer, reader)
}

/// Producer end of a body conduit.
#[derive(Debug)]
pub struct BodyWriter {
    data: mpsc::Sender<Bytes>,
    done: oneshot::Sender<Completion>,
}

impl BodyWriter {
    /// Hands `bytes` to the consumer, waiting while the conduit is full.
    ///
    /// Fails with [`BodyError::Closed`] once the consumer end is dropped.
    pub async fn write(&mut self, bytes: Bytes) -> Result<(), BodyError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.data.send(bytes).await.map_err(|_| BodyError::Closed)
    }

    /// True when the consumer end is gone and further writes would fail.
    pub fn is_closed(&self) -> bool {
        self.data.is_closed()
    }

    /// Ends the body cleanly.
    pub fn close(self) {
        self.finish(Ok(()));
    }

    /// Ends the body; the consumer observes `error` after every chunk already written.
    pub fn close_with_error(self, error: BodyError) {
        self.finish(Err(error));
    }

    fn finish(self, completion: Completion) {
        let Self { data, done } = self;
        // data must be gone first, so the consumer drains every chunk before the completion
        drop(data);
        if done.send(completion).is_err() {
            trace!("body consumer dropped before completion");
        }
    }
}

/// Consumer end of a body conduit: a lazy, single-pass stream of chunks.
///
/// Besides [`pipe`], a reader can wrap bytes that are already in memory ([`BodyReader::full`])
/// or stand for no body at all ([`BodyReader::empty`]).
#[derive(Debug)]
pub struct BodyReader {
    kind: Kind,
    size: PayloadSize,
}

#[derive(Debug)]
enum Kind {
    Empty,
    Full(Option<Bytes>),
    Pipe { data: mpsc::Receiver<Bytes>, done: Option<oneshot::Receiver<Completion>> },
}

impl BodyReader {
    pub fn empty() -> Self {
        Self { kind: Kind::Empty, size: PayloadSize::Empty }
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::empty();
        }
        let size = PayloadSize::Length(bytes.len() as u64);
        Self { kind: Kind::Full(Some(bytes)), size }
    }

    /// The size announced by the producer; `Chunked` means unknown up front.
    pub fn payload_size(&self) -> PayloadSize {
        self.size
    }

    /// Drains the whole body into memory, surfacing the producer's terminal error if any.
    pub async fn read_to_end(self) -> Result<Bytes, BodyError> {
        Ok(BodyExt::collect(self).await?.to_bytes())
    }
}

impl Stream for BodyReader {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match &mut this.kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(bytes) => Poll::Ready(bytes.take().map(Ok)),
            Kind::Pipe { data, done } => {
                if let Some(bytes) = ready!(data.poll_next_unpin(cx)) {
                    return Poll::Ready(Some(Ok(bytes)));
                }

                let Some(completion) = done else {
                    return Poll::Ready(None);
                };

                let result = ready!(completion.poll_unpin(cx));
                *done = None;

                match result {
                    Ok(Ok(())) => Poll::Ready(None),
                    Ok(Err(e)) => Poll::Ready(Some(Err(e))),
                    Err(_canceled) => Poll::Ready(Some(Err(BodyError::Aborted))),
                }
            }
        }
    }
}

impl Body for BodyReader {
    type Data = Bytes;
    type Error = BodyError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(bytes) => bytes.is_none(),
            Kind::Pipe { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        self.size.into()
    }
}

impl From<PayloadSize> for SizeHint {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Chunked => SizeHint::new(),
            PayloadSize::Empty => SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParseError;
    use futures::task::noop_waker_ref;

    #[tokio::test]
    async fn delivers_chunks_in_order_then_eof() {
        let (mut writer, mut reader) = pipe(PayloadSize::Chunked);

        let producer = tokio::spawn(async move {
            for chunk in ["a", "bc", "", "def"] {
                writer.write(Bytes::from(chunk)).await.unwrap();
            }
            writer.close();
        });

        let mut received = Vec::new();
        while let Some(chunk) = reader.next().await {
            received.push(chunk.unwrap());
        }
        producer.await.unwrap();

        assert_eq!(received, vec![Bytes::from("a"), Bytes::from("bc"), Bytes::from("def")]);
    }

    #[tokio::test]
    async fn error_is_observed_after_data() {
        let (mut writer, reader) = pipe(PayloadSize::Length(10));

        tokio::spawn(async move {
            writer.write(Bytes::from_static(b"hello")).await.unwrap();
            writer.close_with_error(ParseError::UnexpectedEof.into());
        });

        let mut reader = reader;
        assert_eq!(reader.next().await.unwrap().unwrap(), Bytes::from_static(b"hello"));
        assert!(matches!(reader.next().await, Some(Err(BodyError::Read { source: ParseError::UnexpectedEof }))));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn dropped_writer_is_not_a_clean_eof() {
        let (mut writer, reader) = pipe(PayloadSize::Chunked);
        writer.write(Bytes::from_static(b"partial")).await.unwrap();
        drop(writer);

        assert!(matches!(reader.read_to_end().await, Err(BodyError::Aborted)));
    }

    #[tokio::test]
    async fn writer_fails_once_reader_is_gone() {
        let (mut writer, reader) = pipe(PayloadSize::Chunked);
        drop(reader);

        assert!(writer.is_closed());
        assert!(matches!(writer.write(Bytes::from_static(b"x")).await, Err(BodyError::Closed)));
    }

    #[test]
    fn writer_blocks_when_buffer_is_full() {
        let (mut writer, mut reader) = pipe(PayloadSize::Chunked);
        let mut cx = Context::from_waker(noop_waker_ref());

        for _ in 0..PIPE_BUFFER {
            let mut write = Box::pin(writer.write(Bytes::from_static(b"x")));
            assert!(write.poll_unpin(&mut cx).is_ready());
        }

        {
            let mut write = Box::pin(writer.write(Bytes::from_static(b"x")));
            assert!(write.poll_unpin(&mut cx).is_pending());
        }

        assert!(matches!(Pin::new(&mut reader).poll_next(&mut cx), Poll::Ready(Some(Ok(_)))));
    }

    #[tokio::test]
    async fn full_and_empty_readers() {
        let full = BodyReader::full("content");
        assert_eq!(full.payload_size(), PayloadSize::Length(7));
        assert_eq!(full.read_to_end().await.unwrap(), Bytes::from_static(b"content"));

        let empty = BodyReader::full(Bytes::new());
        assert!(empty.is_end_stream());
        assert_eq!(Body::size_hint(&empty).exact(), Some(0));
        assert!(empty.read_to_end().await.unwrap().is_empty());
    }
}
