use micro_proxy_http::protocol::{MessageHead, RequestHead};
use url::{Host, Position, Url};

use crate::error::ProxyError;

const DEFAULT_PORT: u16 = 80;

/// Where a forwarded request goes, derived from its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Absolute URL as the client wrote it, matched against the page rewrite rules.
    ///
    /// Not normalized: `http://Example.com:80/a` stays as it is.
    pub url: String,
    /// Host name or address to dial, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    /// Path and query sent to the origin in place of the absolute target.
    pub relative_target: String,
}

impl Destination {
    /// Derives the destination of a non-CONNECT request.
    ///
    /// Absolute targets are used as they are, origin-relative ones (`/path`) are resolved
    /// against the `Host` header. User info, fragments and opaque URLs are refused, and so is
    /// any scheme but `http`.
    pub fn from_request(request: &RequestHead) -> Result<Self, ProxyError> {
        let target = request.target().trim();

        let raw = if target.starts_with('/') {
            let host = request
                .headers()
                .get("Host")
                .ok_or_else(|| ProxyError::bad_request(format!("\"{target}\" is relative and there is no Host header")))?;
            format!("http://{}{target}", host.trim())
        } else {
            target.to_string()
        };
        let url = parse_url(&raw)?;

        if url.cannot_be_a_base() || !url.username().is_empty() || url.password().is_some() || url.fragment().is_some()
        {
            return Err(ProxyError::bad_request(format!("\"{target}\" contains prohibited elements")));
        }

        if url.scheme() != "http" {
            return Err(ProxyError::not_implemented(format!("scheme \"{}\" is not supported", url.scheme())));
        }

        let host = match url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => return Err(ProxyError::bad_request(format!("\"{target}\" has no host"))),
        };
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);
        let relative_target = url[Position::BeforePath..Position::AfterQuery].to_string();

        Ok(Self { url: raw, host, port, relative_target })
    }

    /// `host:port` as it would appear in a URL.
    pub fn authority(&self) -> String {
        if self.host.contains(':') { format!("[{}]:{}", self.host, self.port) } else { format!("{}:{}", self.host, self.port) }
    }
}

fn parse_url(target: &str) -> Result<Url, ProxyError> {
    Url::parse(target).map_err(|e| ProxyError::bad_request(format!("can't parse \"{target}\": {e}")))
}
