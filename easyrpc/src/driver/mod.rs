#![forbid(unsafe_code)]

pub mod mock;
pub mod queue;
pub mod wsclient;

pub use mock::RecordingChannel;
pub use queue::QueueChannel;
pub use wsclient::WsDriver;

/// Driver trait for transport layer abstraction.
///
/// Implementors own the connection lifecycle only: connect/reconnect and raw
/// frame I/O. Protocol handling stays with the caller.
#[async_trait::async_trait]
pub trait Driver: Send + 'static {
    async fn run(self: Box<Self>) -> anyhow::Result<()>;
}
