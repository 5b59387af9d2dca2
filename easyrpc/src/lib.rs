//! easyrpc
//!
//! JSON-RPC 2.0 message envelopes, a header store that seals on hand-off, and
//! a send pipeline that pushes converted messages into socket channels.

#![forbid(unsafe_code)]
pub mod core;
pub mod driver;
pub mod prelude;

pub use easyrpc_protocol as protocol;
