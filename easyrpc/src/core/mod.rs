pub mod accessor;
pub mod channel;
pub mod config;
pub mod converter;
pub mod error;
pub mod header;
pub mod message;
pub mod observability;
pub mod registry;
pub mod template;

pub use accessor::MessageHeaderAccessor;
pub use channel::MessageChannel;
pub use config::{ChannelConfig, ConfigStore, Configurable};
pub use converter::{JsonRpcMessageConverter, MessageConverter};
pub use error::{
    DispatchError, JsonRequestError, JsonResponseError, MessagingError, RpcFailure, check_response,
};
pub use header::{HeaderMap, MessageHeaders, MessageType};
pub use message::{Message, MessageBuilder};
pub use observability::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use registry::{MethodHandler, MethodRegistry};
pub use template::{MessagePostProcessor, SendingTemplate};
