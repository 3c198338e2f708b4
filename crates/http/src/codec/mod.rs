//! Streaming codecs for HTTP/1.x messages.
//!
//! Both directions share one shape: a message is a head followed by payload items, and the
//! codec runs a small state machine that switches from the head phase to the body phase and
//! back.
//!
//! - [`MessageDecoder`] (as [`RequestDecoder`] or [`ResponseDecoder`]) yields
//!   [`Message::Header`](crate::protocol::Message) once, then payload chunks until
//!   [`PayloadItem::Eof`](crate::protocol::PayloadItem).
//! - [`MessageEncoder`] takes the same items and writes them with the framing the head
//!   announced.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_proxy_http::codec::RequestDecoder;
//! use micro_proxy_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from(&b"GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);
//! let mut decoder = RequestDecoder::new();
//!
//! let Some(Message::Header((head, payload_size))) = decoder.decode(&mut buffer).unwrap() else {
//!     panic!("expected a request head");
//! };
//! assert_eq!(head.target(), "http://example.com/");
//! assert!(payload_size.is_empty());
//! ```

mod body;
mod header;
mod message_decoder;
mod message_encoder;

pub use body::{PayloadDecoder, PayloadEncoder};
pub use header::{HeadDecoder, HeadEncoder, payload_size};
pub use message_decoder::{MessageDecoder, RequestDecoder, ResponseDecoder};
pub use message_encoder::MessageEncoder;

use bytes::{BufMut, BytesMut};
use std::io;

/// `io::Write` adapter over a `BytesMut`, so `write!` can format straight into the buffer.
pub(crate) struct FastWrite<'a>(pub(crate) &'a mut BytesMut);

impl io::Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
