use std::io::Write;
use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::FastWrite;
use crate::protocol::{MessageHead, SendError};

/// Initial buffer size allocated for head serialization
const INIT_HEAD_SIZE: usize = 4 * 1024;

/// Encoder for message heads implementing the [`Encoder`] trait.
///
/// Headers are written exactly as held by the head; framing headers are the caller's business.
#[derive(Debug)]
pub struct HeadEncoder<H> {
    _head: PhantomData<fn(H)>,
}

impl<H> HeadEncoder<H> {
    pub fn new() -> Self {
        Self { _head: PhantomData }
    }
}

impl<H> Default for HeadEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: MessageHead> Encoder<&H> for HeadEncoder<H> {
    type Error = SendError;

    fn encode(&mut self, head: &H, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEAD_SIZE);

        write!(FastWrite(dst), "{}\r\n", head.start_line())?;

        for header in head.headers() {
            dst.put_slice(header.key().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(header.value().as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
