//! Streaming message bodies.
//!
//! A body travels through a bounded conduit: the side that decodes or produces it holds a
//! [`BodyWriter`], the side that forwards it holds a [`BodyReader`]. The reader implements both
//! `futures::Stream` and `http_body::Body`, so it can be drained chunk by chunk or collected.
//! A producer failure is never reported as a clean end of data.

mod pipe;

pub use pipe::BodyReader;
pub use pipe::BodyWriter;
pub use pipe::pipe;
