//! Page rewriting.
//!
//! [`ResponseFilter`] decides whether a response is rewritten at all: the request URL must
//! match at least one configured rule, the response must be `text/html`, and its
//! `Content-Encoding` must be one the filter can undo. A rewritten body is buffered, decoded,
//! handed to a [`ContentTransform`], encoded again and sent with a fixed length. Everything
//! else is streamed through untouched.

mod encoding;
mod html;

pub use encoding::ContentEncoding;
pub use html::ElementRemover;

use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

use bytes::Bytes;
use micro_proxy_http::protocol::body::BodyReader;
use micro_proxy_http::protocol::{Headers, MessageHead, ResponseHead};
use scraper::Selector;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::error::ProxyError;

/// Rewrites a decoded page.
///
/// Any error leaves the page as the origin sent it.
pub trait ContentTransform: fmt::Debug + Send + Sync {
    fn transform(&self, content: &[u8], selectors: &[Selector]) -> Result<Vec<u8>, TransformError>;
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("content is not valid utf-8: {source}")]
    NotUtf8 {
        #[from]
        source: Utf8Error,
    },

    #[error("can't decode or encode content: {source}")]
    Encoding {
        #[from]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ResponseFilter {
    config: Arc<ProxyConfig>,
    transform: Arc<dyn ContentTransform>,
}

impl ResponseFilter {
    pub fn new(config: Arc<ProxyConfig>, transform: Arc<dyn ContentTransform>) -> Self {
        Self { config, transform }
    }

    /// Returns the response to send for a request to `url`, rewritten when the rules ask for it.
    ///
    /// Only a failure to read the origin's body is an error; a page that can't be rewritten is
    /// passed through as it was received.
    pub async fn apply(
        &self,
        url: &str,
        mut head: ResponseHead,
        body: BodyReader,
    ) -> Result<(ResponseHead, BodyReader), ProxyError> {
        let selectors = self.config.selectors_for(url);
        if selectors.is_empty() || !is_html(head.headers()) || body.payload_size().is_empty() {
            return Ok((head, body));
        }

        let Some(encoding) = ContentEncoding::from_headers(head.headers()) else {
            debug!(%url, encoding = ?head.headers().get("Content-Encoding"), "unsupported content encoding, skip rewriting");
            return Ok((head, body));
        };

        let raw = body.read_to_end().await.map_err(|e| ProxyError::bad_gateway(format!("can't read page body: {e}")))?;

        let transform = Arc::clone(&self.transform);
        let source = raw.clone();
        let rewritten =
            tokio::task::spawn_blocking(move || rewrite(transform.as_ref(), encoding, &source, &selectors)).await;

        let content = match rewritten {
            Ok(Ok(content)) => Bytes::from(content),
            Ok(Err(e)) => {
                warn!(%url, cause = %e, "can't rewrite page, pass it through");
                raw
            }
            Err(e) => {
                warn!(%url, cause = %e, "rewrite task failed, pass the page through");
                raw
            }
        };

        head.headers_mut().set_chunked(false);
        Ok((head, BodyReader::full(content)))
    }
}

fn rewrite(
    transform: &dyn ContentTransform,
    encoding: ContentEncoding,
    raw: &[u8],
    selectors: &[Selector],
) -> Result<Vec<u8>, TransformError> {
    let decoded = encoding.decode(raw)?;
    let transformed = transform.transform(&decoded, selectors)?;
    Ok(encoding.encode(&transformed)?)
}

fn is_html(headers: &Headers) -> bool {
    headers
        .get("Content-Type")
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|content_type| content_type.type_() == mime::TEXT && content_type.subtype() == mime::HTML)
}
