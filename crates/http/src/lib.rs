//! The HTTP/1.x message engine of micro-proxy.
//!
//! This crate reads and writes HTTP/1.0 and HTTP/1.1 messages as a proxy needs them: heads are
//! parsed before the body is known, bodies stream through bounded conduits instead of being
//! buffered, and headers are kept in wire order and spelling so a forwarded message looks like
//! the one received.
//!
//! # Architecture
//!
//! - [`protocol`]: message heads, the ordered [`Headers`](protocol::Headers) multimap, body
//!   conduits and error types
//! - [`codec`]: `tokio-util` decoders and encoders for heads, fixed-length and chunked bodies
//! - [`connection`]: [`MessageReader`](connection::MessageReader) and
//!   [`MessageWriter`](connection::MessageWriter), which drive the codecs over async streams
//!
//! # Example
//!
//! ```no_run
//! use micro_proxy_http::connection::{RequestReader, RequestWriter};
//! use tokio::net::TcpStream;
//!
//! # async fn forward(client: TcpStream, origin: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let (client_read, _client_write) = client.into_split();
//! let (_origin_read, origin_write) = origin.into_split();
//!
//! let mut reader = RequestReader::new(client_read);
//! let (head, payload_size) = reader.read_head().await?;
//! let body = reader.into_body(payload_size);
//!
//! RequestWriter::new(origin_write).write_message(head, body).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - Trailers of chunked bodies are read and dropped
//! - Maximum line length: 8KB, maximum head size: 64KB, maximum number of headers: 128

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
