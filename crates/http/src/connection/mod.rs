//! Driving the codecs over real byte streams.
//!
//! - [`MessageReader`] reads a head off an `AsyncRead` and hands the body over to a spawned
//!   producer task that streams it through a [`BodyReader`](crate::protocol::body::BodyReader).
//! - [`MessageWriter`] writes a head plus a body to an `AsyncWrite`, fixing up the framing
//!   headers on the way out.

mod message_reader;
mod message_writer;

pub use message_reader::MessageReader;
pub use message_reader::RequestReader;
pub use message_reader::ResponseReader;
pub use message_writer::MessageWriter;
pub use message_writer::RequestWriter;
pub use message_writer::ResponseWriter;
