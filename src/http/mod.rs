//! HTTP wire layer.
//!
//! Value types and pure serialization/parsing for the client side of
//! HTTP/1.1. Nothing in this module performs I/O; the dispatch engine feeds
//! bytes in and out.
//!
//! # Architecture
//!
//! - **`headers`**: ordered, case-insensitive, multi-valued header map
//! - **`cookie`**: cookie value type, outbound serialization, Set-Cookie parsing
//! - **`request`**: outbound request representation with builder and body kinds
//! - **`multipart`**: multipart parts, boundary generation, body encoding
//! - **`response`**: immutable received response with body accessors
//! - **`parser`**: parses response heads and chunked bodies from byte buffers
//! - **`writer`**: serializes requests into wire bytes
//!
//! # Request lifecycle
//!
//! ```text
//!   RequestBuilder ──build()──▶ Request
//!        │                        │ writer::serialize_request
//!        ▼                        ▼
//!   (body kinds resolved)    wire bytes ──▶ transport
//!
//!   transport ──▶ parser::parse_response_head ──▶ ResponseHead
//!                        │ parser::body_framing
//!                        ▼
//!                  body bytes (chunked reassembled, gzip decoded)
//!                        │
//!                        ▼
//!                     Response
//! ```

pub mod cookie;
pub mod headers;
pub mod multipart;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
