//! wirehttp - HTTP/1.1 over raw TCP
//!
//! Request framing, routing, content-encoding negotiation and response
//! serialization, written directly against a byte stream.

pub mod config;
pub mod http;
pub mod routing;
pub mod server;
pub mod storage;
