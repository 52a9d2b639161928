//! Client facade.
//!
//! Owns the process-wide configuration and the connection pool, and turns
//! simple arguments into dispatched requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;

use crate::config::ClientConfig;
use crate::dispatch::engine::DispatchEngine;
use crate::dispatch::future::ResponseFuture;
use crate::dispatch::handler::AsyncHandler;
use crate::dispatch::pool::ConnectionPool;
use crate::error::Error;
use crate::http::headers::HeaderMap;
use crate::http::multipart::Part;
use crate::http::request::{Method, Request, RequestBuilder};

/// Asynchronous HTTP client.
///
/// Cheap to share: configuration is read-only after construction and the
/// pool is the only shared state. `close` releases pooled connections and
/// makes every subsequent dispatch fail with [`Error::Closed`].
pub struct Client {
    engine: DispatchEngine,
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let pool = Arc::new(ConnectionPool::new());
        Self {
            engine: DispatchEngine::new(pool, Arc::clone(&config)),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Dispatches a prepared request with the default timeout.
    pub fn execute<H: AsyncHandler>(
        &self,
        request: Request,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        self.engine.dispatch(request, handler, Duration::ZERO)
    }

    /// Dispatches a prepared request with an explicit timeout.
    pub fn execute_with_timeout<H: AsyncHandler>(
        &self,
        request: Request,
        handler: H,
        timeout: Duration,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        self.engine.dispatch(request, handler, timeout)
    }

    pub fn get<H: AsyncHandler>(
        &self,
        url: &str,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = Request::builder(Method::GET, url).build()?;
        self.execute(request, handler)
    }

    pub fn post_bytes<H: AsyncHandler>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: impl Into<Vec<u8>>,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = self.prepare(Method::POST, url, headers).body(body).build()?;
        self.execute(request, handler)
    }

    pub fn post_stream<H: AsyncHandler>(
        &self,
        url: &str,
        headers: HeaderMap,
        stream: impl AsyncRead + Send + Unpin + 'static,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = self
            .prepare(Method::POST, url, headers)
            .body_stream(stream)
            .build()?;
        self.execute(request, handler)
    }

    pub fn post_params<H: AsyncHandler>(
        &self,
        url: &str,
        headers: HeaderMap,
        params: Vec<(String, String)>,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = self
            .prepare(Method::POST, url, headers)
            .params(params)
            .build()?;
        self.execute(request, handler)
    }

    pub fn post_entity<H: AsyncHandler>(
        &self,
        url: &str,
        headers: HeaderMap,
        writer: impl FnOnce(&mut dyn std::io::Write) -> std::io::Result<()> + Send + 'static,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = self
            .prepare(Method::POST, url, headers)
            .entity_writer(writer)
            .build()?;
        self.execute(request, handler)
    }

    pub fn put_bytes<H: AsyncHandler>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: impl Into<Vec<u8>>,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = self.prepare(Method::PUT, url, headers).body(body).build()?;
        self.execute(request, handler)
    }

    pub fn multipart_post<H: AsyncHandler>(
        &self,
        url: &str,
        parts: Vec<Part>,
        handler: H,
    ) -> Result<ResponseFuture<H::Output>, Error> {
        let request = Request::builder(Method::POST, url).parts(parts).build()?;
        self.execute(request, handler)
    }

    /// Releases all pooled connections. Subsequent dispatches fail with
    /// [`Error::Closed`]; operations already in flight run to their own
    /// terminal state.
    pub async fn close(&self) {
        self.engine.pool().close().await;
    }

    fn prepare(&self, method: Method, url: &str, headers: HeaderMap) -> RequestBuilder {
        Request::builder(method, url).headers(headers)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
