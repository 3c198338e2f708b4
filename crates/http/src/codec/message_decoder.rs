//! Decoder for a complete message: head, then body.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeadDecoder;
use crate::protocol::{Message, MessageHead, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead};
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

/// A decoder for HTTP messages that handles both the head and the payload.
///
/// The decoder operates in two phases:
/// 1. Head parsing: decodes the start line and headers using [`HeadDecoder`]
/// 2. Payload parsing: decodes the body, if any, using [`PayloadDecoder`]
///
/// The state lives in `payload_decoder`: `None` while parsing a head, `Some` while parsing a body.
///
/// The [`PayloadSize`] reported with the head is the framing actually used for the body. It is
/// [`PayloadSize::Empty`] whenever the message may not carry a body, whatever its headers say.
#[derive(Debug)]
pub struct MessageDecoder<H> {
    head_decoder: HeadDecoder<H>,
    payload_decoder: Option<PayloadDecoder>,
    body_allowed: bool,
}

pub type RequestDecoder = MessageDecoder<RequestHead>;

pub type ResponseDecoder = MessageDecoder<ResponseHead>;

impl<H> MessageDecoder<H> {
    pub fn new() -> Self {
        Self { head_decoder: HeadDecoder::new(), payload_decoder: None, body_allowed: true }
    }
}

impl<H> Default for MessageDecoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// A decoder for the response to `request`: a response to `HEAD` never has a body.
    pub fn for_request(request: &RequestHead) -> Self {
        Self { body_allowed: *request.method() != Method::HEAD, ..Self::new() }
    }
}

impl<H: MessageHead> Decoder for MessageDecoder<H> {
    type Item = Message<(H, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // parse payload if have payload_decoder
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // the body is complete, next comes a head again
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.head_decoder.decode(src)? {
            Some((head, payload_size)) => {
                let payload_size = if self.body_allowed && head.may_have_body() { payload_size } else { PayloadSize::Empty };
                trace!(?payload_size, "decoded message head");
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
