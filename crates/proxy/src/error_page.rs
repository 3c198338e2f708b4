use http::{StatusCode, Version};
use micro_proxy_http::protocol::body::BodyReader;
use micro_proxy_http::protocol::{MessageHead, ResponseHead};

use crate::config::ProxyConfig;
use crate::synthetic::{self, SERVER_NAME};

/// The page used when the configuration names no template of its own.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/error.html");

/// Renders the HTML page that answers a failed request.
///
/// The template is plain HTML with `{{STATUS}}`, `{{REASON}}`, `{{ERROR}}`, `{{SERVER_NAME}}` and
/// `{{LISTEN_ON}}` placeholders.
#[derive(Debug, Clone)]
pub struct ErrorPage {
    template: String,
    listen_on: String,
}

impl ErrorPage {
    pub fn new(template: impl Into<String>, listen_on: impl Into<String>) -> Self {
        Self { template: template.into(), listen_on: listen_on.into() }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.error_template(), config.listen_on())
    }

    pub fn render(&self, status: StatusCode, cause: &str) -> String {
        self.template
            .replace("{{STATUS}}", status.as_str())
            .replace("{{REASON}}", status.canonical_reason().unwrap_or_default())
            .replace("{{ERROR}}", &escape_html(cause))
            .replace("{{SERVER_NAME}}", SERVER_NAME)
            .replace("{{LISTEN_ON}}", &escape_html(&self.listen_on))
    }

    /// An `HTTP/1.0` response carrying the rendered page with a fixed length.
    pub fn response(&self, status: StatusCode, cause: &str) -> (ResponseHead, BodyReader) {
        let mut head = synthetic::response_head(Version::HTTP_10, status);
        let headers = head.headers_mut();
        headers.set("Content-Type", "text/html");
        headers.set_chunked(false);

        (head, BodyReader::full(self.render(status, cause)))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use micro_proxy_http::connection::ResponseWriter;

    #[test]
    fn render_placeholders() {
        let page = ErrorPage::new("{{STATUS}}|{{REASON}}|{{ERROR}}|{{SERVER_NAME}}|{{LISTEN_ON}}", "127.0.0.1:8080");

        assert_eq!(
            page.render(StatusCode::BAD_GATEWAY, "can't reach <origin> & \"friends\""),
            "502|Bad Gateway|can&#39;t reach &lt;origin&gt; &amp; &quot;friends&quot;|micro-proxy|127.0.0.1:8080"
        );
    }

    #[test]
    fn default_template_mentions_everything() {
        let page = ErrorPage::new(DEFAULT_TEMPLATE, ":8080").render(StatusCode::FORBIDDEN, "no tunnels");

        assert!(page.contains("<title>403 Forbidden</title>"));
        assert!(page.contains("no tunnels"));
        assert!(page.contains("micro-proxy at :8080"));
        assert!(!page.contains("{{"));
    }

    #[tokio::test]
    async fn http_10_page_on_the_wire() {
        let (head, body) = ErrorPage::new("<p>{{ERROR}}</p>", ":8080").response(StatusCode::BAD_REQUEST, "oops");
        let mut writer = ResponseWriter::new(Vec::new());

        writer.write_message(head, body).await.unwrap();

        let wire = String::from_utf8(writer.into_inner()).unwrap();
        let (head, body) = wire.split_once("\r\n\r\n").unwrap();
        let mut lines = head.split("\r\n");

        assert_eq!(lines.next(), Some("HTTP/1.0 400 Bad Request"));
        let headers = lines.collect::<Vec<_>>();
        assert!(headers.contains(&"Server: micro-proxy"));
        assert!(headers.iter().any(|line| line.starts_with("Date: ")));
        assert!(headers.contains(&"Content-Type: text/html"));
        assert!(headers.contains(&"Content-Length: 11"));
        assert!(headers.contains(&"Connection: close"));
        assert!(!headers.iter().any(|line| line.starts_with("Transfer-Encoding")));
        assert_eq!(body, "<p>oops</p>");
    }
}
