//! HTTP response head handling.
//!
//! The reason phrase is carried verbatim so a proxied status line is reproduced exactly.

use http::{StatusCode, Version};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::protocol::head::{parse_version, version_str};
use crate::protocol::{Headers, MessageHead, ParseError};

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(HTTP/\S+) (\d{3})(?: (.*))?$").unwrap());

/// Represents an HTTP response head: protocol version, status, reason phrase and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: Headers,
}

impl ResponseHead {
    pub fn new(version: Version, status: StatusCode, reason: impl Into<String>) -> Self {
        Self { version, status, reason: reason.into(), headers: Headers::new() }
    }

    /// Builds a head whose reason phrase is the canonical one for `status`.
    pub fn canonical(version: Version, status: StatusCode) -> Self {
        Self::new(version, status, status.canonical_reason().unwrap_or_default())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

impl MessageHead for ResponseHead {
    fn parse_start_line(line: &str) -> Result<Self, ParseError> {
        let captures = STATUS_LINE.captures(line).ok_or_else(|| ParseError::invalid_status_line(line))?;

        let version = parse_version(&captures[1])?;
        let status = StatusCode::from_bytes(captures[2].as_bytes()).map_err(|_| ParseError::invalid_status_line(line))?;
        let reason = captures.get(3).map_or("", |reason| reason.as_str());

        Ok(Self::new(version, status, reason))
    }

    fn start_line(&self) -> String {
        format!("{} {} {}", version_str(self.version), self.status.as_str(), self.reason)
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Informational, `204 No Content` and `304 Not Modified` responses never have a body.
    fn may_have_body(&self) -> bool {
        !(self.status.is_informational() || self.status == StatusCode::NO_CONTENT || self.status == StatusCode::NOT_MODIFIED)
    }
}
