//! The start line plus header block shared by requests and responses.

use crate::protocol::{Headers, ParseError};
use http::Version;

/// Common behaviour of [`RequestHead`](crate::protocol::RequestHead) and
/// [`ResponseHead`](crate::protocol::ResponseHead) needed by the generic codec.
pub trait MessageHead: Sized {
    /// Parses the start line, producing a head with no headers yet.
    fn parse_start_line(line: &str) -> Result<Self, ParseError>;

    /// Renders the start line without the trailing CRLF.
    fn start_line(&self) -> String;

    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    /// Whether this kind of message may carry a body at all, independent of its framing headers.
    fn may_have_body(&self) -> bool;
}

pub(crate) fn parse_version(version: &str) -> Result<Version, ParseError> {
    match version {
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        // HTTP/2 and HTTP/3 are not spoken on this wire format
        other => Err(ParseError::invalid_version(other)),
    }
}

pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions() {
        assert_eq!(parse_version("HTTP/1.0").unwrap(), Version::HTTP_10);
        assert_eq!(version_str(parse_version("HTTP/1.1").unwrap()), "HTTP/1.1");
        assert!(matches!(parse_version("HTTP/2"), Err(ParseError::InvalidVersion { .. })));
    }
}
