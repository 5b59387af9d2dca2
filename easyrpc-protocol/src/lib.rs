//! easyrpc wire protocol
//!
//! JSON-RPC 2.0 values exchanged over the socket. This crate only describes
//! the shapes; assembling and dispatching messages lives in `easyrpc`.
//!
//! # Message kinds
//!
//! - [`RpcRequest`] - a call expecting a correlated [`RpcResponse`]
//! - [`RpcResponse`] - carries either a `result` or an [`RpcError`]
//! - [`RpcNotification`] - fire-and-forget, no `id` on the wire

mod rpc;

pub use rpc::*;

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";
