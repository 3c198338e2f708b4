//! HTTP request head handling.
//!
//! A [`RequestHead`] keeps the request target as the raw string from the wire, since a proxy
//! rewrites it (absolute-URL to origin-relative path) before forwarding.

use http::{Method, Version};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::protocol::head::{parse_version, version_str};
use crate::protocol::{Headers, MessageHead, ParseError};

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+) (.+) (HTTP/\S+)$").unwrap());

/// Represents an HTTP request head: method, target, protocol version and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    target: String,
    version: Version,
    headers: Headers,
}

impl RequestHead {
    pub fn new(method: Method, target: impl Into<String>, version: Version) -> Self {
        Self { method, target: target.into(), version, headers: Headers::new() }
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the raw request target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Replaces the request target, e.g. with its origin-relative form.
    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_connect(&self) -> bool {
        self.method == Method::CONNECT
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

impl MessageHead for RequestHead {
    fn parse_start_line(line: &str) -> Result<Self, ParseError> {
        let captures = REQUEST_LINE.captures(line).ok_or_else(|| ParseError::invalid_request_line(line))?;

        let method = Method::from_bytes(captures[1].as_bytes()).map_err(|_| ParseError::invalid_request_line(line))?;
        let version = parse_version(&captures[3])?;

        Ok(Self::new(method, &captures[2], version))
    }

    fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, version_str(self.version))
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// A CONNECT request never carries a body: whatever follows its head belongs to the tunnel.
    fn may_have_body(&self) -> bool {
        !self.is_connect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_absolute_form() {
        let head = RequestHead::parse_start_line("GET http://example.com/path?q=1 HTTP/1.1").unwrap();

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.target(), "http://example.com/path?q=1");
        assert_eq!(head.version(), Version::HTTP_11);
        assert!(head.headers().is_empty());
        assert!(head.may_have_body());
    }

    #[test]
    fn parse_connect() {
        let head = RequestHead::parse_start_line("CONNECT example.com:443 HTTP/1.0").unwrap();

        assert!(head.is_connect());
        assert!(!head.may_have_body());
        assert_eq!(head.start_line(), "CONNECT example.com:443 HTTP/1.0");
    }

    #[test]
    fn reject_malformed_lines() {
        for line in ["", "GET", "GET /", "GET / FTP/1.1", "G-T / HTTP/1.1", "GET  HTTP/1.1"] {
            assert!(
                matches!(RequestHead::parse_start_line(line), Err(ParseError::InvalidRequestLine { .. })),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn reject_unknown_version() {
        assert!(matches!(
            RequestHead::parse_start_line("GET / HTTP/2.0"),
            Err(ParseError::InvalidVersion { .. })
        ));
    }
}
