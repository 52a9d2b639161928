//! In-process HTTP fixture server for integration tests.
//!
//! Echoes enough of each request back (headers, form parameters, cookies,
//! body) for tests to assert what actually went over the wire, and offers
//! a few special paths (gzip, chunked, close) plus a delay knob.

#![allow(dead_code)]

use std::io::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use courier::dispatch::handler::AsyncHandler;
use courier::error::{BoxError, Error};
use courier::http::response::Response;

pub struct EchoServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

/// Installs a fmt subscriber once per test binary so engine tracing shows
/// up under `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .try_init();
}

impl EchoServer {
    pub async fn spawn() -> Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let _ = serve(stream).await;
                });
            }
        });

        Ok(Self { addr, connections })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// TCP connections accepted so far (for keep-alive assertions).
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

pub struct ParsedRequest {
    pub request_line: String,
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

async fn serve(mut stream: TcpStream) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        let req = match read_request(&mut stream, &mut buf).await? {
            Some(req) => req,
            None => return Ok(()),
        };

        if let Some(ms) = req.header("X-Delay-Ms").and_then(|v| v.parse().ok()) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        let close = req.path.starts_with("/close");
        let response = build_response(&req);
        stream.write_all(&response).await?;

        if close {
            return Ok(());
        }
    }
}

async fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Result<Option<ParsedRequest>> {
    let headers_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8(buf[..headers_end].to_vec())?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default().to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    let body_start = headers_end + 4;
    while buf.len() < body_start + content_length {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[body_start..body_start + content_length].to_vec();
    buf.drain(..body_start + content_length);

    Ok(Some(ParsedRequest {
        request_line,
        method,
        path,
        headers,
        body,
    }))
}

fn build_response(req: &ParsedRequest) -> Vec<u8> {
    if req.path.starts_with("/gzip") {
        return gzip_response();
    }
    if req.path.starts_with("/chunked") {
        return chunked_response();
    }

    let mut headers: Vec<(String, String)> = vec![
        ("Content-Type".to_string(), "text/plain".to_string()),
        ("X-Method".to_string(), req.method.clone()),
        ("X-Request-Line".to_string(), req.request_line.clone()),
    ];

    if let Some(host) = req.header("Host") {
        headers.push(("X-Host".to_string(), host.to_string()));
    }
    if let Some(ct) = req.header("Content-Type") {
        headers.push(("X-Content-Type".to_string(), ct.to_string()));
    }
    if let Some(cookie) = req.header("Cookie") {
        headers.push(("Set-Cookie".to_string(), cookie.to_string()));
    }
    if let Some(enc) = req.header("Accept-Encoding") {
        headers.push(("X-Accept-Encoding".to_string(), enc.to_string()));
    }

    // Custom request headers come back as X-<name>
    for (k, v) in &req.headers {
        if k.starts_with("Test") {
            headers.push((format!("X-{}", k), v.clone()));
        }
    }

    // Form bodies come back as X-<param>
    let is_form = req
        .header("Content-Type")
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        let body = String::from_utf8_lossy(&req.body);
        for pair in body.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                headers.push((format!("X-{}", k), v.to_string()));
            }
        }
    }

    let body: &[u8] = if req.method == "HEAD" { b"" } else { &req.body };

    if req.path.starts_with("/close") {
        headers.push(("Connection".to_string(), "close".to_string()));
    }

    write_response(200, "OK", &headers, body)
}

fn gzip_response() -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"compressed payload").unwrap();
    let body = encoder.finish().unwrap();

    write_response(
        200,
        "OK",
        &[
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("Content-Encoding".to_string(), "gzip".to_string()),
        ],
        &body,
    )
}

fn chunked_response() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
    out.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n");
    out
}

fn write_response(status: u16, reason: &str, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", status, reason).as_bytes());
    for (k, v) in headers {
        out.extend_from_slice(format!("{}: {}\r\n", k, v).as_bytes());
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

/// Handler that counts terminal callbacks, for exactly-once assertions.
pub struct CountingHandler {
    pub completed: Arc<AtomicUsize>,
    pub failed: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        (
            Self {
                completed: Arc::clone(&completed),
                failed: Arc::clone(&failed),
            },
            completed,
            failed,
        )
    }
}

impl AsyncHandler for CountingHandler {
    type Output = Response;

    fn on_completed(&mut self, response: Response) -> Result<Response, BoxError> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(response)
    }

    fn on_throwable(&mut self, _error: &Error) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}
