use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line is too long, exceed the limit {max_size}")]
    TooLongLine { max_size: usize },

    #[error("head size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHead { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid request line \"{line}\"")]
    InvalidRequestLine { line: String },

    #[error("invalid status line \"{line}\"")]
    InvalidStatusLine { line: String },

    #[error("invalid header line \"{line}\"")]
    InvalidHeaderLine { line: String },

    #[error("invalid http version: {version}")]
    InvalidVersion { version: String },

    #[error("can't convert Content-Length to integer: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection closed before the message was complete")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_long_line(max_size: usize) -> Self {
        Self::TooLongLine { max_size }
    }

    pub fn too_large_head(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHead { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_request_line<S: ToString>(line: S) -> Self {
        Self::InvalidRequestLine { line: line.to_string() }
    }

    pub fn invalid_status_line<S: ToString>(line: S) -> Self {
        Self::InvalidStatusLine { line: line.to_string() }
    }

    pub fn invalid_header_line<S: ToString>(line: S) -> Self {
        Self::InvalidHeaderLine { line: line.to_string() }
    }

    pub fn invalid_version<S: ToString>(version: S) -> Self {
        Self::InvalidVersion { version: version.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body error: {source}")]
    Body {
        #[from]
        source: BodyError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// The terminal error a body consumer observes in place of clean end-of-data.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("failed to read body: {source}")]
    Read {
        #[from]
        source: ParseError,
    },

    #[error("body producer failed: {reason}")]
    Producer { reason: String },

    #[error("body producer went away without closing the body")]
    Aborted,

    #[error("body consumer went away")]
    Closed,
}

impl BodyError {
    pub fn producer<S: ToString>(reason: S) -> Self {
        Self::Producer { reason: reason.to_string() }
    }
}

impl From<io::Error> for BodyError {
    fn from(e: io::Error) -> Self {
        Self::Read { source: ParseError::io(e) }
    }
}
