use bytes::Bytes;

use crate::http::cookie::Cookie;
use crate::http::headers::HeaderMap;

/// A complete HTTP response as received from the peer.
///
/// Constructed only by the dispatch engine once the full wire response has
/// arrived (chunked bodies reassembled, compressed bodies decoded);
/// immutable thereafter. Headers are preserved as received, including
/// `Transfer-Encoding` and `Content-Encoding`.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    body: Bytes,
}

impl Response {
    /// Assembles a response from its parsed pieces.
    ///
    /// Note: called by the dispatch engine; public for integration testing
    /// purposes.
    pub fn new(status: u16, status_text: String, headers: HeaderMap, body: Bytes) -> Self {
        let cookies = headers
            .get_all("Set-Cookie")
            .into_iter()
            .filter_map(Cookie::parse_set_cookie)
            .collect();

        Self {
            status,
            status_text,
            headers,
            cookies,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// All values of a header, in received order.
    pub fn header_all(&self, key: &str) -> Vec<&str> {
        self.headers.get_all(key)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// The declared `Content-Length`, when present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("Content-Length").and_then(|v| v.parse().ok())
    }

    /// Cookies parsed from every `Set-Cookie` header.
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// The full response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// At most the first `max` bytes of the body.
    pub fn body_excerpt(&self, max: usize) -> &[u8] {
        &self.body[..self.body.len().min(max)]
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the peer allows this connection to be reused.
    ///
    /// HTTP/1.1 defaults to keep-alive unless the peer sent
    /// `Connection: close`.
    pub fn keep_alive(&self) -> bool {
        self.headers
            .get("Connection")
            .map(|v| !v.eq_ignore_ascii_case("close"))
            .unwrap_or(true)
    }
}
