//! Message head framing: the start line plus the header block up to the empty line.
//!
//! - [`HeadDecoder`] splits a complete head off the input, parses it into a
//!   [`MessageHead`](crate::protocol::MessageHead) and reports the body framing it announces.
//! - [`HeadEncoder`] renders a head back to wire bytes, header order and spelling untouched.

mod head_decoder;
mod head_encoder;

pub use head_decoder::HeadDecoder;
pub use head_decoder::payload_size;
pub use head_encoder::HeadEncoder;
