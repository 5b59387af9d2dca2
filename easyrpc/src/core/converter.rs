use easyrpc_protocol::{RpcNotification, RpcResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{MessagingError, check_response};
use crate::core::header::MessageHeaders;
use crate::core::message::{Message, MessageBuilder};

/// Turns application payloads into protocol messages
pub trait MessageConverter {
    /// Wrap `payload` into a notification addressed to `destination`.
    ///
    /// Pure: no I/O, and `headers` are attached as given.
    fn to_message<T>(
        &self,
        payload: &T,
        headers: MessageHeaders,
        destination: &str,
    ) -> Result<Message<RpcNotification>, MessagingError>
    where
        T: Serialize + ?Sized;
}

/// Default converter: `method = destination`, `params = payload` as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRpcMessageConverter;

impl JsonRpcMessageConverter {
    pub fn new() -> Self {
        Self
    }

    /// Read the params of a converted message back into `T`
    pub fn from_message<T: DeserializeOwned>(
        &self,
        message: &Message<RpcNotification>,
    ) -> Result<T, MessagingError> {
        Ok(serde_json::from_value(message.payload().params.clone())?)
    }

    /// Decode the result of a correlated response, surfacing a JSON-RPC
    /// error as [`MessagingError::Protocol`]
    pub fn from_response<T: DeserializeOwned>(
        &self,
        response: RpcResponse,
    ) -> Result<T, MessagingError> {
        let result = check_response(response)?;
        Ok(serde_json::from_value(result)?)
    }
}

impl MessageConverter for JsonRpcMessageConverter {
    fn to_message<T>(
        &self,
        payload: &T,
        headers: MessageHeaders,
        destination: &str,
    ) -> Result<Message<RpcNotification>, MessagingError>
    where
        T: Serialize + ?Sized,
    {
        let params = serde_json::to_value(payload)?;
        let notification = RpcNotification::new(destination, params);

        Ok(MessageBuilder::from_payload(notification)
            .with_headers(headers)
            .build())
    }
}
