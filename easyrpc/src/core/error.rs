//! Failure types for sending and for JSON-RPC error exchange.

use std::error::Error as StdError;

use easyrpc_protocol::{RpcError, RpcRequest, RpcResponse};
use serde_json::Value;

use crate::core::message::Message;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error returned by the send pipeline and header handling
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Invalid send target: blank destination or a message without a method
    #[error("invalid send target: {0}")]
    Configuration(String),

    /// Mutation of a sealed header store
    #[error("illegal header state: {0}")]
    State(String),

    /// The channel refused the message
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The remote side answered with a JSON-RPC error
    #[error(transparent)]
    Protocol(#[from] JsonResponseError),

    #[error("payload conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// The channel did not accept a message
#[derive(Debug, thiserror::Error)]
#[error("failed to send to destination {destination}")]
pub struct DispatchError {
    destination: String,
    message: Message<Value>,
}

impl DispatchError {
    pub fn new(destination: impl Into<String>, message: Message<Value>) -> Self {
        Self {
            destination: destination.into(),
            message,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The message that was attempted
    pub fn message(&self) -> &Message<Value> {
        &self.message
    }

    pub fn into_message(self) -> Message<Value> {
        self.message
    }
}

/// A local handler failed while serving a request
///
/// Carries the error to reply with and, when there is one, the request that
/// triggered it.
#[derive(Debug, thiserror::Error)]
#[error("request failed: message = {}, code = {}", .error.message, .error.code)]
pub struct JsonRequestError {
    error: RpcError,
    original_request: Option<RpcRequest>,
    #[source]
    cause: Option<BoxError>,
}

impl JsonRequestError {
    pub fn new(error: RpcError, original_request: Option<RpcRequest>) -> Self {
        Self {
            error,
            original_request,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn rpc_error(&self) -> &RpcError {
        &self.error
    }

    pub fn original_request(&self) -> Option<&RpcRequest> {
        self.original_request.as_ref()
    }

    /// Error reply for the originating request, if there is one to answer
    pub fn into_response(self) -> Option<RpcResponse> {
        let id = self.original_request.as_ref()?.id;
        Some(RpcResponse::error(self.error, id))
    }
}

/// A correlated response came back with a JSON-RPC error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("message = {}, code = {}", .error.message, .error.code)]
pub struct JsonResponseError {
    error: RpcError,
}

impl JsonResponseError {
    pub fn new(error: RpcError) -> Self {
        Self { error }
    }

    pub fn rpc_error(&self) -> &RpcError {
        &self.error
    }

    pub fn into_rpc_error(self) -> RpcError {
        self.error
    }
}

/// Unwrap a response: its result, or its error as [`JsonResponseError`]
///
/// A success response without a result yields `Value::Null`.
pub fn check_response(response: RpcResponse) -> Result<Value, JsonResponseError> {
    match response.error {
        Some(error) => Err(JsonResponseError::new(error)),
        None => Ok(response.result.unwrap_or(Value::Null)),
    }
}

/// Either side of a failed JSON-RPC exchange
#[derive(Debug, thiserror::Error)]
pub enum RpcFailure {
    /// Raised locally while handling a request
    #[error(transparent)]
    Dispatch(#[from] JsonRequestError),

    /// Received from the remote side
    #[error(transparent)]
    Protocol(#[from] JsonResponseError),
}

impl RpcFailure {
    pub fn rpc_error(&self) -> &RpcError {
        match self {
            Self::Dispatch(e) => e.rpc_error(),
            Self::Protocol(e) => e.rpc_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn response_error_display_is_derived_from_the_error() {
        let err = JsonResponseError::new(RpcError::new(404, "no such topic"));
        assert_eq!(err.to_string(), "message = no such topic, code = 404");
    }

    #[test]
    fn request_error_allows_missing_request() {
        let err = JsonRequestError::new(RpcError::internal_error(), None);

        assert!(err.original_request().is_none());
        assert_eq!(err.rpc_error().code, -32603);
        assert!(err.into_response().is_none());
    }

    #[test]
    fn request_error_answers_the_original_request() {
        let request = RpcRequest::new("subscribe", json!({ "topic": "a" }), 9);
        let err = JsonRequestError::new(RpcError::new(400, "bad topic"), Some(request.clone()))
            .with_cause(std::io::Error::other("disk"));

        assert_eq!(err.original_request(), Some(&request));
        assert!(err.source().is_some());

        let response = err.into_response().unwrap();
        assert_eq!(response.id, 9);
        assert_eq!(response.error.unwrap().message, "bad topic");
    }

    #[test]
    fn check_response_splits_result_and_error() {
        let ok = check_response(RpcResponse::success(json!("pong"), 1)).unwrap();
        assert_eq!(ok, json!("pong"));

        let err = check_response(RpcResponse::error(RpcError::method_not_found(), 2)).unwrap_err();
        assert_eq!(err.rpc_error().code, -32601);
    }

    #[test]
    fn failure_exposes_the_rpc_error_of_either_side() {
        let local: RpcFailure = JsonRequestError::new(RpcError::invalid_params(), None).into();
        let remote: RpcFailure = JsonResponseError::new(RpcError::new(503, "busy")).into();

        assert_eq!(local.rpc_error().code, -32602);
        assert_eq!(remote.rpc_error().code, 503);
        assert_eq!(remote.to_string(), "message = busy, code = 503");
    }
}
