use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::Error;

/// One-time-write cell shared between a pending operation and its future
/// handle.
///
/// The engine writes the terminal result here once; the same write is what
/// the future observes. A losing terminal path (completion racing timeout
/// or cancellation) finds the cell already written and is ignored.
pub(crate) struct ResultCell<T> {
    value: Mutex<Option<Result<T, Error>>>,
    done: AtomicBool,
    cancel_requested: AtomicBool,
    done_notify: Notify,
    cancel_notify: Notify,
}

impl<T> ResultCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            done: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            done_notify: Notify::new(),
            cancel_notify: Notify::new(),
        }
    }

    /// Writes the terminal result. The first write wins; returns `false`
    /// when the cell was already resolved.
    pub(crate) fn try_complete(&self, result: Result<T, Error>) -> bool {
        {
            let mut slot = self.value.lock().unwrap();
            if self.done.load(Ordering::Acquire) {
                return false;
            }
            *slot = Some(result);
            self.done.store(true, Ordering::Release);
        }
        self.done_notify.notify_waiters();
        true
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Flags the operation for cooperative cancellation. Returns `false`
    /// when the cell was already resolved.
    pub(crate) fn request_cancel(&self) -> bool {
        if self.done.load(Ordering::Acquire) {
            return false;
        }
        self.cancel_requested.store(true, Ordering::Release);
        self.cancel_notify.notify_waiters();
        true
    }

    /// Resolves once cancellation has been requested.
    pub(crate) async fn cancel_requested(&self) {
        loop {
            if self.cancel_requested.load(Ordering::Acquire) {
                return;
            }
            let notified = self.cancel_notify.notified();
            if self.cancel_requested.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    async fn wait_done(&self) {
        loop {
            if self.done.load(Ordering::Acquire) {
                return;
            }
            let notified = self.done_notify.notified();
            if self.done.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    fn take(&self) -> Result<T, Error> {
        match self.value.lock().unwrap().take() {
            Some(result) => result,
            None => Err(Error::Protocol("result already taken".to_string())),
        }
    }
}

/// Handle to the eventual result of a dispatched request.
///
/// Returned immediately by `dispatch`. Resolves to exactly the value or
/// error the request's handler observed.
pub struct ResponseFuture<T> {
    cell: Arc<ResultCell<T>>,
}

impl<T> std::fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("is_done", &self.cell.is_done())
            .finish()
    }
}

impl<T> ResponseFuture<T> {
    pub(crate) fn new(cell: Arc<ResultCell<T>>) -> Self {
        Self { cell }
    }

    /// Whether a terminal result has been written.
    pub fn is_done(&self) -> bool {
        self.cell.is_done()
    }

    /// Requests cooperative cancellation of the in-flight operation.
    ///
    /// Best-effort: a response that has already fully arrived may still be
    /// delivered. Returns `false` when the operation had already reached a
    /// terminal state.
    pub fn cancel(&self) -> bool {
        self.cell.request_cancel()
    }

    /// Waits for the terminal result.
    pub async fn get(self) -> Result<T, Error> {
        self.cell.wait_done().await;
        self.cell.take()
    }

    /// Waits for the terminal result, at most `bound`.
    ///
    /// Expiry drops the handle; the operation itself continues to its own
    /// terminal state and its handler still fires.
    pub async fn get_timeout(self, bound: Duration) -> Result<T, Error> {
        match tokio::time::timeout(bound, self.cell.wait_done()).await {
            Ok(()) => self.cell.take(),
            Err(_) => Err(Error::Timeout(bound)),
        }
    }
}
