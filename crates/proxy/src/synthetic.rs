//! Responses the proxy makes up itself rather than relaying from an origin.

use http::{StatusCode, Version};
use micro_proxy_http::protocol::{MessageHead, ResponseHead};

pub const SERVER_NAME: &str = "micro-proxy";

/// The current time as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date() -> String {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// A head with the canonical reason phrase, `Server` and `Date`.
pub fn response_head(version: Version, status: StatusCode) -> ResponseHead {
    let mut head = ResponseHead::canonical(version, status);
    let headers = head.headers_mut();
    headers.set("Server", SERVER_NAME);
    headers.set("Date", http_date());
    head
}
