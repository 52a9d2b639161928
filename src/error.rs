use std::time::Duration;

/// Boxed error type accepted from user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the client.
///
/// Callers are expected to match on the variant: a `Connect` failure and a
/// `Timeout` call for different retry policy, and `Cancelled` is a terminal
/// outcome rather than a fault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request target could not be used (missing host, unsupported
    /// scheme, unparseable URL).
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Opening a TCP connection to the target (or proxy) failed.
    #[error("failed to connect to {authority}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    /// The per-request timeout elapsed before a terminal response.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled through its future handle.
    #[error("request cancelled")]
    Cancelled,

    /// The client was closed before or during the dispatch.
    #[error("client is closed")]
    Closed,

    /// The peer sent bytes that do not form a valid HTTP response.
    #[error("malformed response: {0}")]
    Protocol(String),

    /// I/O failure while writing the request or reading the response.
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    /// The user handler's `on_completed` returned an error.
    #[error("handler error")]
    Handler(#[source] BoxError),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_connect(&self) -> bool {
        matches!(self, Error::Connect { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
