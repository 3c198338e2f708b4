use bytes::{Buf, Bytes};

/// One decoded unit of an HTTP/1.x stream: the head first, then body pieces.
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// A piece of body, or the marker that the body is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// How the body following a head is framed on the wire.
///
/// `Empty` covers messages that can't carry a body at all (`HEAD` answers, `1xx`, `204`,
/// `304`, requests without framing headers).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// `Length(0)` counts as empty too.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }
}

impl<T> Message<T> {
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Payload(item) => Some(item),
            Message::Header(_) => None,
        }
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Message::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
