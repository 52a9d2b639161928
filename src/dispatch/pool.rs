//! Connection acquisition and reuse.
//!
//! The pool is the one resource shared across concurrent dispatches. It is
//! keyed by scheme+host+port; a released connection becomes eligible for
//! reuse by a later `acquire` with the same key, and a discarded connection
//! is never reused.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use url::Url;

use crate::config::ProxyServer;
use crate::error::Error;

/// Idle connections kept per authority. Beyond this, released connections
/// are dropped.
const MAX_IDLE_PER_AUTHORITY: usize = 8;

/// A connection target: scheme, host, and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Authority {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// The authority a URL connects to, with the scheme's default port
    /// filled in.
    pub fn from_url(url: &Url) -> Result<Self, Error> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", url)))?;
        let port = url.port().unwrap_or(match url.scheme() {
            "https" => 443,
            _ => 80,
        });
        Ok(Self::new(url.scheme(), host, port))
    }

    pub fn from_proxy(proxy: &ProxyServer) -> Self {
        Self::new("http", proxy.host.clone(), proxy.port)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// An open transport connection to one authority.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    authority: Authority,
}

impl Connection {
    /// Opens a new TCP connection to `authority`.
    pub async fn open(authority: Authority) -> Result<Self, Error> {
        let addr = format!("{}:{}", authority.host, authority.port);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| Error::Connect {
                authority: authority.to_string(),
                source,
            })?;

        tracing::debug!(authority = %authority, "connected");

        Ok(Self { stream, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> std::io::Result<usize> {
        self.stream.read_buf(buf).await
    }
}

/// Pool of reusable connections, keyed by authority.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    idle: Mutex<HashMap<Authority, Vec<Connection>>>,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops an idle connection for `authority`, or opens a new one.
    pub async fn acquire(&self, authority: &Authority) -> Result<Connection, Error> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        if let Some(conn) = self
            .idle
            .lock()
            .await
            .get_mut(authority)
            .and_then(Vec::pop)
        {
            tracing::trace!(authority = %authority, "reusing pooled connection");
            return Ok(conn);
        }

        Connection::open(authority.clone()).await
    }

    /// Returns a connection to the idle list for its authority.
    pub async fn release(&self, conn: Connection) {
        if self.is_closed() {
            return;
        }

        let mut idle = self.idle.lock().await;
        let slot = idle.entry(conn.authority().clone()).or_default();

        if slot.len() < MAX_IDLE_PER_AUTHORITY {
            tracing::trace!(authority = %conn.authority(), "released connection to pool");
            slot.push(conn);
        } else {
            tracing::trace!(authority = %conn.authority(), "idle list full, dropping connection");
        }
    }

    /// Drops a connection whose state is unknown. It is never reused.
    pub fn discard(&self, conn: Connection) {
        tracing::trace!(authority = %conn.authority(), "discarding connection");
        drop(conn);
    }

    /// Closes the pool: drains every idle connection and makes subsequent
    /// `acquire` calls fail with [`Error::Closed`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.idle.lock().await.clear();
        tracing::debug!("connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idle connections currently held for `authority`.
    pub async fn idle_count(&self, authority: &Authority) -> usize {
        self.idle
            .lock()
            .await
            .get(authority)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
