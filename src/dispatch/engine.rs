//! Per-request dispatch coordination.
//!
//! Each dispatch spawns one task that drives the exchange against the
//! transport and races it with the request deadline and cooperative
//! cancellation. Whichever terminal event occurs first is delivered to the
//! handler and the result cell; losing paths are ignored.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use flate2::read::GzDecoder;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::dispatch::future::{ResponseFuture, ResultCell};
use crate::dispatch::handler::AsyncHandler;
use crate::dispatch::pool::{Authority, Connection, ConnectionPool};
use crate::error::Error;
use crate::http::parser::{self, BodyFraming, ParseError, ResponseHead};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer;

const BUFFER_SIZE: usize = 8192;
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Asynchronous request dispatch engine.
///
/// `dispatch` returns a future handle immediately and never blocks the
/// caller; the exchange runs on a spawned task. Exactly one of the
/// handler's callbacks is invoked, exactly once, per dispatch, and the
/// future resolves to the same outcome.
pub struct DispatchEngine {
    pool: Arc<ConnectionPool>,
    config: Arc<ClientConfig>,
}

/// Where a request actually connects. A proxy changes the connection
/// target and switches the request line to absolute form; a virtual host
/// never affects routing.
struct Route {
    authority: Authority,
    via_proxy: bool,
}

impl DispatchEngine {
    pub fn new(pool: Arc<ConnectionPool>, config: Arc<ClientConfig>) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Dispatches `request`, delivering the terminal result to `handler`
    /// and to the returned future.
    ///
    /// `timeout` bounds the whole operation including connection setup;
    /// `Duration::ZERO` selects the configured default. Fails
    /// synchronously only for immediately-detectable conditions (closed
    /// client, unusable target); connect failures are routed through
    /// `on_throwable` and the future.
    pub fn dispatch<H: AsyncHandler>(
        &self,
        request: Request,
        handler: H,
        timeout: Duration,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        if self.pool.is_closed() {
            return Err(Error::Closed);
        }

        let route = resolve_route(&request, &self.config)?;
        let timeout = if timeout.is_zero() {
            self.config.request_timeout()
        } else {
            timeout
        };

        let cell = Arc::new(ResultCell::new());

        let op = PendingOperation {
            request,
            handler,
            cell: Arc::clone(&cell),
            route,
            timeout,
            pool: Arc::clone(&self.pool),
            config: Arc::clone(&self.config),
        };
        tokio::spawn(op.run());

        Ok(ResponseFuture::new(cell))
    }
}

fn resolve_route(request: &Request, config: &ClientConfig) -> Result<Route, Error> {
    if let Some(proxy) = request.proxy.as_ref().or(config.proxy.as_ref()) {
        return Ok(Route {
            authority: Authority::from_proxy(proxy),
            via_proxy: true,
        });
    }

    let authority = Authority::from_url(&request.url)?;
    if authority.scheme == "https" {
        return Err(Error::InvalidUrl(format!(
            "{}: https targets are not supported",
            request.url
        )));
    }

    Ok(Route {
        authority,
        via_proxy: false,
    })
}

/// Engine-internal record of one in-flight dispatch. Owns the request, the
/// handler, and the result cell; destroyed once the terminal result has
/// been delivered.
struct PendingOperation<H: AsyncHandler> {
    request: Request,
    handler: H,
    cell: Arc<ResultCell<H::Output>>,
    route: Route,
    timeout: Duration,
    pool: Arc<ConnectionPool>,
    config: Arc<ClientConfig>,
}

impl<H: AsyncHandler> PendingOperation<H> {
    async fn run(self) {
        let PendingOperation {
            request,
            mut handler,
            cell,
            route,
            timeout,
            pool,
            config,
        } = self;

        let method = request.method;
        let url = request.url.to_string();
        let deadline = Instant::now() + timeout;

        tracing::debug!(
            method = %method,
            url = %url,
            authority = %route.authority,
            via_proxy = route.via_proxy,
            "dispatching request"
        );

        // First terminal event wins. The drive branch is polled first, so a
        // fully-arrived response beats a simultaneous cancel or deadline.
        let outcome = tokio::select! {
            biased;
            res = drive(request, &pool, &config, &route) => res,
            _ = tokio::time::sleep_until(deadline) => Err(Error::Timeout(timeout)),
            _ = cell.cancel_requested() => Err(Error::Cancelled),
        };

        match outcome {
            Ok(response) => {
                tracing::info!(
                    method = %method,
                    url = %url,
                    status = response.status(),
                    "request completed"
                );

                match handler.on_completed(response) {
                    Ok(value) => {
                        if !cell.try_complete(Ok(value)) {
                            tracing::debug!(url = %url, "late completion ignored");
                        }
                    }
                    Err(source) => {
                        let error = Error::Handler(source);
                        handler.on_throwable(&error);
                        if !cell.try_complete(Err(error)) {
                            tracing::debug!(url = %url, "late handler error ignored");
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(method = %method, url = %url, error = %error, "request failed");

                handler.on_throwable(&error);
                if !cell.try_complete(Err(error)) {
                    tracing::debug!(url = %url, "late failure ignored");
                }
            }
        }
    }
}

/// One pass of the exchange: acquire, write, read, decode.
///
/// The connection is released to the pool only after a cleanly framed
/// response with keep-alive semantics; on any error it is discarded. When
/// this future is dropped mid-exchange (timeout, cancellation) the
/// connection drops with it and is never pooled.
async fn drive(
    request: Request,
    pool: &ConnectionPool,
    config: &ClientConfig,
    route: &Route,
) -> Result<Response, Error> {
    let method = request.method;

    let mut conn = pool.acquire(&route.authority).await?;

    let wire = writer::serialize_request(request, config, route.via_proxy).await?;
    if let Err(e) = conn.write_all(&wire).await {
        pool.discard(conn);
        return Err(Error::Io(e));
    }

    match read_response(&mut conn, method, config).await {
        Ok((response, reusable)) => {
            if reusable && response.keep_alive() {
                pool.release(conn).await;
            } else {
                pool.discard(conn);
            }
            Ok(response)
        }
        Err(e) => {
            pool.discard(conn);
            Err(e)
        }
    }
}

/// Reads one complete response. Returns the response and whether the
/// connection is cleanly positioned for reuse.
async fn read_response(
    conn: &mut Connection,
    method: Method,
    config: &ClientConfig,
) -> Result<(Response, bool), Error> {
    let mut buf = BytesMut::with_capacity(BUFFER_SIZE);

    let (head, consumed) = loop {
        match parser::parse_response_head(&buf) {
            Ok(parsed) => break parsed,
            Err(ParseError::Incomplete) => {}
            Err(e) => return Err(Error::Protocol(format!("{:?}", e))),
        }

        if buf.len() > MAX_HEADER_BYTES {
            return Err(Error::Protocol("response headers too large".to_string()));
        }

        let n = conn.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(Error::Protocol(
                "connection closed before response head".to_string(),
            ));
        }
    };
    buf.advance(consumed);

    let framing =
        parser::body_framing(method, &head).map_err(|e| Error::Protocol(format!("{:?}", e)))?;

    let (raw_body, clean) = match framing {
        BodyFraming::None => (Vec::new(), true),

        BodyFraming::ContentLength(len) => {
            while buf.len() < len {
                let n = conn.read_buf(&mut buf).await?;
                if n == 0 {
                    return Err(Error::Protocol(
                        "connection closed before complete body".to_string(),
                    ));
                }
            }
            (buf.split_to(len).to_vec(), true)
        }

        BodyFraming::Chunked => loop {
            match parser::decode_chunked(&buf) {
                Ok((body, consumed)) => {
                    buf.advance(consumed);
                    break (body, true);
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(Error::Protocol(format!("{:?}", e))),
            }

            let n = conn.read_buf(&mut buf).await?;
            if n == 0 {
                return Err(Error::Protocol(
                    "connection closed mid-chunk".to_string(),
                ));
            }
        },

        BodyFraming::UntilClose => {
            loop {
                let n = conn.read_buf(&mut buf).await?;
                if n == 0 {
                    break;
                }
            }
            // The peer closed the connection to delimit the body.
            (buf.split().to_vec(), false)
        }
    };

    let body = decode_body(raw_body, &head, config)?;
    let reusable = clean && buf.is_empty();

    let response = Response::new(head.status, head.status_text, head.headers, Bytes::from(body));
    Ok((response, reusable))
}

/// Transparently decodes a gzip body when compression is enabled. Headers
/// are left as received.
fn decode_body(
    raw: Vec<u8>,
    head: &ResponseHead,
    config: &ClientConfig,
) -> Result<Vec<u8>, Error> {
    let gzipped = head
        .headers
        .get("Content-Encoding")
        .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("gzip")))
        .unwrap_or(false);

    if !(config.compression_enabled && gzipped) || raw.is_empty() {
        return Ok(raw);
    }

    let mut decoder = GzDecoder::new(raw.as_slice());
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Protocol(format!("gzip decode failed: {}", e)))?;
    Ok(out)
}
