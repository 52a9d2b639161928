//! Courier - Asynchronous HTTP Client
//!
//! Core library for asynchronous HTTP request dispatch: a client facade
//! over a dispatch engine that executes requests on a non-blocking
//! transport and delivers each result exactly once, through a
//! handler/future pair.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
