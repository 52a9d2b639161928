//! Asynchronous request dispatch.
//!
//! This module is the coordination layer between the wire types in
//! [`crate::http`] and user code: it owns connection acquisition, request
//! write, response read, timeout, and cancellation for every in-flight
//! request, and guarantees exactly-once delivery of a terminal result.
//!
//! # Operation state machine
//!
//! Each dispatched request runs through one spawned task:
//!
//! ```text
//!        ┌─────────────┐
//!        │  Acquiring  │ ← pooled connection or fresh TCP connect
//!        └──────┬──────┘
//!               │ connection ready
//!               ▼
//!        ┌─────────────┐
//!        │   Writing   │ ← serialized request onto the transport
//!        └──────┬──────┘
//!               │ request sent
//!               ▼
//!        ┌─────────────┐
//!        │   Reading   │ ← head, then body per its framing
//!        └──────┬──────┘
//!               │ complete response
//!               ▼
//!        ┌─────────────┐
//!        │  Terminal   │ ← handler invoked once, future resolved
//!        └─────────────┘
//! ```
//!
//! At every suspension point the task races the deadline and the cancel
//! flag; the first terminal event (success, failure, timeout, cancel)
//! wins and the others are ignored.

pub mod engine;
pub mod future;
pub mod handler;
pub mod pool;

pub use engine::DispatchEngine;
pub use future::ResponseFuture;
pub use handler::{AsyncHandler, DefaultHandler};
pub use pool::{Authority, Connection, ConnectionPool};
