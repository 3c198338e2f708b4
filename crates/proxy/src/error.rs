use std::io;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Why a proxied exchange failed.
///
/// Every variant but [`ProxyError::Unclassified`] maps to a status code, and the connection
/// handler answers those with an error page as long as nothing was sent to the client yet.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("bad gateway: {reason}")]
    BadGateway { reason: String },

    #[error("not implemented: {reason}")]
    NotImplemented { reason: String },

    #[error("{reason}")]
    Unclassified { reason: String },
}

impl ProxyError {
    pub fn bad_request<S: ToString>(reason: S) -> Self {
        Self::BadRequest { reason: reason.to_string() }
    }

    pub fn forbidden<S: ToString>(reason: S) -> Self {
        Self::Forbidden { reason: reason.to_string() }
    }

    pub fn bad_gateway<S: ToString>(reason: S) -> Self {
        Self::BadGateway { reason: reason.to_string() }
    }

    pub fn not_implemented<S: ToString>(reason: S) -> Self {
        Self::NotImplemented { reason: reason.to_string() }
    }

    pub fn unclassified<S: ToString>(reason: S) -> Self {
        Self::Unclassified { reason: reason.to_string() }
    }

    /// The status to answer with, `None` when the connection should just be dropped.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            Self::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            Self::BadGateway { .. } => Some(StatusCode::BAD_GATEWAY),
            Self::NotImplemented { .. } => Some(StatusCode::NOT_IMPLEMENTED),
            Self::Unclassified { .. } => None,
        }
    }

    /// The cause without the classification prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::BadRequest { reason }
            | Self::Forbidden { reason }
            | Self::BadGateway { reason }
            | Self::NotImplemented { reason }
            | Self::Unclassified { reason } => reason,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("malformed config: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid pattern \"{pattern}\": {source}")]
    Pattern { pattern: String, source: regex::Error },

    #[error("invalid selector \"{selector}\": {reason}")]
    Selector { selector: String, reason: String },

    #[error("can't read error template {path}: {source}")]
    Template { path: PathBuf, source: io::Error },
}
