// Convenience re-exports: use easyrpc::prelude::*;
pub use crate::core::{
    ChannelConfig, ConfigStore, Configurable, HeaderMap, InMemoryMetrics, JsonRequestError,
    JsonResponseError, JsonRpcMessageConverter, Message, MessageBuilder, MessageChannel,
    MessageConverter, MessageHeaderAccessor, MessageHeaders, MessageType, MessagingError,
    MethodRegistry, RpcFailure, SendingTemplate,
};

pub use crate::driver::{Driver, QueueChannel, WsDriver};

pub use easyrpc_protocol::{RpcError, RpcNotification, RpcRequest, RpcResponse};
