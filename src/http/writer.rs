use tokio::io::AsyncReadExt;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::multipart;
use crate::http::request::{Body, Method, Request};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a request into the bytes sent on the wire.
///
/// Resolves whichever body kind the request carries (draining streams and
/// running entity writers), rewrites the `Host` header for virtual hosts,
/// switches to the absolute-form request line when routed via a proxy, and
/// advertises gzip when compression is enabled. Public so the wire format
/// can be asserted in tests without a socket.
pub async fn serialize_request(
    request: Request,
    config: &ClientConfig,
    via_proxy: bool,
) -> Result<Vec<u8>, Error> {
    let Request {
        method,
        url,
        headers,
        body,
        cookies,
        virtual_host,
        ..
    } = request;

    let (body_bytes, body_content_type) = resolve_body(body).await?;

    let mut buf = Vec::new();

    // Request line: origin-form normally, absolute-form through a proxy
    let target = request_target(&url, via_proxy);
    buf.extend_from_slice(format!("{} {} {}\r\n", method, target, HTTP_VERSION).as_bytes());

    // User headers first, order and repeats preserved
    let mut emitted = headers.clone();
    for (key, value) in headers.iter() {
        write_header(&mut buf, key, value);
    }

    for (key, value) in &config.default_headers {
        if !emitted.contains(key) {
            write_header(&mut buf, key, value);
            emitted.add(key.clone(), value.clone());
        }
    }

    if !emitted.contains("Host") {
        let host = match &virtual_host {
            Some(vhost) => vhost.clone(),
            None => host_header_value(&url),
        };
        write_header(&mut buf, "Host", &host);
        emitted.add("Host", host);
    }

    if config.compression_enabled && !emitted.contains("Accept-Encoding") {
        write_header(&mut buf, "Accept-Encoding", "gzip");
        emitted.add("Accept-Encoding", "gzip");
    }

    if !cookies.is_empty() && !emitted.contains("Cookie") {
        let value = cookies
            .iter()
            .map(|c| c.to_wire())
            .collect::<Vec<_>>()
            .join("; ");
        write_header(&mut buf, "Cookie", &value);
        emitted.add("Cookie", value);
    }

    if let Some(ct) = body_content_type {
        if !emitted.contains("Content-Type") {
            write_header(&mut buf, "Content-Type", &ct);
            emitted.add("Content-Type", ct);
        }
    }

    let needs_length = body_bytes.is_some()
        || matches!(method, Method::POST | Method::PUT | Method::PATCH);
    if needs_length && !emitted.contains("Content-Length") {
        let len = body_bytes.as_ref().map(Vec::len).unwrap_or(0);
        write_header(&mut buf, "Content-Length", &len.to_string());
    }

    buf.extend_from_slice(b"\r\n");

    if let Some(body) = body_bytes {
        buf.extend_from_slice(&body);
    }

    Ok(buf)
}

/// The request-line target for `url`.
pub fn request_target(url: &Url, via_proxy: bool) -> String {
    if via_proxy {
        return url.as_str().to_string();
    }

    let mut target = url.path().to_string();
    if target.is_empty() {
        target.push('/');
    }
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// The `Host` header value for `url`: host, plus the port when the URL
/// names a non-default one.
pub fn host_header_value(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn write_header(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// Resolves a body kind into bytes plus the content type it implies.
async fn resolve_body(body: Option<Body>) -> Result<(Option<Vec<u8>>, Option<String>), Error> {
    match body {
        None => Ok((None, None)),

        Some(Body::Bytes(bytes)) => Ok((Some(bytes), None)),

        Some(Body::Stream(mut stream)) => {
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).await?;
            Ok((Some(bytes), None))
        }

        Some(Body::Params(params)) => {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &params {
                serializer.append_pair(key, value);
            }
            let encoded = serializer.finish().into_bytes();
            Ok((
                Some(encoded),
                Some("application/x-www-form-urlencoded".to_string()),
            ))
        }

        Some(Body::Multipart(parts)) => {
            let boundary = multipart::generate_boundary(&parts);
            let encoded = multipart::encode(&parts, &boundary);
            Ok((
                Some(encoded),
                Some(format!("multipart/form-data; boundary={}", boundary)),
            ))
        }

        Some(Body::EntityWriter(writer)) => {
            let mut sink = Vec::new();
            writer(&mut sink)?;
            Ok((Some(sink), None))
        }
    }
}
