//! Core HTTP/1.x message abstractions.
//!
//! - **Heads** ([`RequestHead`], [`ResponseHead`]): start line plus an ordered [`Headers`] list,
//!   parsed and rendered through the [`MessageHead`] trait.
//! - **Payload** ([`Message`], [`PayloadItem`], [`PayloadSize`]): what the codecs produce.
//! - **Bodies** ([`body`]): the bounded conduit bodies stream through.
//! - **Errors** ([`ParseError`], [`SendError`], [`BodyError`]).

mod head;
pub use head::MessageHead;
pub use head::version_str;

mod header;
pub use header::Header;
pub use header::Headers;

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::BodyError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
