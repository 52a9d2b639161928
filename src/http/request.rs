use std::fmt;

use tokio::io::AsyncRead;
use url::Url;

use crate::config::ProxyServer;
use crate::error::Error;
use crate::http::cookie::Cookie;
use crate::http::headers::HeaderMap;
use crate::http::multipart::Part;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
}

impl Method {
    /// Parses an HTTP method from its uppercase wire form.
    ///
    /// # Example
    ///
    /// ```
    /// # use courier::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deferred body producer, invoked at send time to write the entity into
/// an in-memory sink.
pub type EntityWriter = Box<dyn FnOnce(&mut dyn std::io::Write) -> std::io::Result<()> + Send>;

/// The request entity. A request carries at most one body kind; setting a
/// second kind on the builder replaces the first.
pub enum Body {
    /// Raw bytes, sent as-is.
    Bytes(Vec<u8>),
    /// An async byte source, drained fully at send time.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// Form parameters, sent as `application/x-www-form-urlencoded`.
    Params(Vec<(String, String)>),
    /// Ordered multipart parts, sent as `multipart/form-data`.
    Multipart(Vec<Part>),
    /// A deferred entity writer, invoked at send time.
    EntityWriter(EntityWriter),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Stream(_) => f.write_str("Stream"),
            Body::Params(p) => f.debug_tuple("Params").field(&p.len()).finish(),
            Body::Multipart(p) => f.debug_tuple("Multipart").field(&p.len()).finish(),
            Body::EntityWriter(_) => f.write_str("EntityWriter"),
        }
    }
}

/// An outbound HTTP request, immutable once built.
///
/// The virtual-host override replaces the `Host` header sent on the wire
/// without changing the connection target; the proxy override changes the
/// connection target for this request only.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub cookies: Vec<Cookie>,
    pub virtual_host: Option<String>,
    pub proxy: Option<ProxyServer>,
}

impl Request {
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }
}

/// Builder for [`Request`].
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Body>,
    cookies: Vec<Cookie>,
    virtual_host: Option<String>,
    proxy: Option<ProxyServer>,
}

impl RequestBuilder {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            cookies: Vec::new(),
            virtual_host: None,
            proxy: None,
        }
    }

    /// Appends a header value, preserving values already added under the
    /// same key.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(key, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (k, v) in headers.iter() {
            self.headers.add(k, v);
        }
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Replaces the transmitted `Host` header without changing the
    /// connection target.
    pub fn virtual_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = Some(host.into());
        self
    }

    /// Routes this request through a proxy, overriding any client-wide
    /// proxy configuration.
    pub fn proxy(mut self, proxy: ProxyServer) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }

    pub fn body_stream(mut self, stream: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.body = Some(Body::Stream(Box::new(stream)));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.body = Some(Body::Params(params));
        self
    }

    pub fn parts(mut self, parts: Vec<Part>) -> Self {
        self.body = Some(Body::Multipart(parts));
        self
    }

    pub fn entity_writer(
        mut self,
        writer: impl FnOnce(&mut dyn std::io::Write) -> std::io::Result<()> + Send + 'static,
    ) -> Self {
        self.body = Some(Body::EntityWriter(Box::new(writer)));
        self
    }

    /// Validates the target URL and assembles the request.
    pub fn build(self) -> Result<Request, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.url, e)))?;
        if url.host_str().is_none() {
            return Err(Error::InvalidUrl(format!("{}: missing host", self.url)));
        }

        Ok(Request {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
            cookies: self.cookies,
            virtual_host: self.virtual_host,
            proxy: self.proxy,
        })
    }
}
