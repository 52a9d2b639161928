use crate::error::{BoxError, Error};
use crate::http::response::Response;

/// Completion protocol for one dispatched request.
///
/// The engine invokes exactly one of the two callbacks, exactly once, per
/// dispatch. An error returned from `on_completed` is redirected into
/// `on_throwable` on the same operation and resolves the future to
/// [`Error::Handler`]; it is never propagated to the dispatch caller.
///
/// Callbacks run on the operation's worker task and must not block it.
pub trait AsyncHandler: Send + 'static {
    /// Value the future resolves to on success.
    type Output: Send + 'static;

    /// Called with the complete response. The returned value becomes the
    /// future's result.
    fn on_completed(&mut self, response: Response) -> Result<Self::Output, BoxError>;

    /// Called with the terminal error (connect failure, timeout,
    /// cancellation, protocol error, or a redirected `on_completed`
    /// failure).
    fn on_throwable(&mut self, error: &Error);
}

/// Passes the response through unchanged and logs failures.
#[derive(Debug, Default)]
pub struct DefaultHandler;

impl AsyncHandler for DefaultHandler {
    type Output = Response;

    fn on_completed(&mut self, response: Response) -> Result<Response, BoxError> {
        Ok(response)
    }

    fn on_throwable(&mut self, error: &Error) {
        tracing::warn!(error = %error, "request failed");
    }
}
