//! Explicit method registry for inbound requests.
//!
//! Handlers are plain functions bound to method names at start-up. There is
//! no discovery: what is registered is what gets served.

use std::collections::HashMap;
use std::sync::Arc;

use easyrpc_protocol::{RpcError, RpcRequest, RpcResponse};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{MessagingError, RpcFailure};

/// Request handler
pub type MethodHandler = Arc<dyn Fn(&RpcRequest) -> Result<Value, RpcFailure> + Send + Sync>;

/// Method name -> handler
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, MethodHandler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `method`
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError::Configuration`] if the name is blank or
    /// already taken.
    pub fn register<F>(
        &mut self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, MessagingError>
    where
        F: Fn(&RpcRequest) -> Result<Value, RpcFailure> + Send + Sync + 'static,
    {
        let method = method.into();

        if method.trim().is_empty() {
            return Err(MessagingError::Configuration(
                "method name is required".to_string(),
            ));
        }
        if self.handlers.contains_key(&method) {
            return Err(MessagingError::Configuration(format!(
                "method '{}' is already registered",
                method
            )));
        }

        debug!("Registering method: {}", method);
        self.handlers.insert(method, Arc::new(handler));
        Ok(self)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `request` and build the correlated response
    pub fn dispatch(&self, request: &RpcRequest) -> RpcResponse {
        let Some(handler) = self.handlers.get(&request.method) else {
            warn!("No handler for method {}", request.method);
            return RpcResponse::error(RpcError::method_not_found(), request.id);
        };

        match handler(request) {
            Ok(result) => RpcResponse::success(result, request.id),
            Err(RpcFailure::Dispatch(e)) => {
                warn!("Method {} failed: {}", request.method, e);
                RpcResponse::error(e.rpc_error().clone(), request.id)
            }
            Err(RpcFailure::Protocol(e)) => {
                warn!("Method {} got a remote error: {}", request.method, e);
                RpcResponse::error(e.into_rpc_error(), request.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::error::{JsonRequestError, JsonResponseError};

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry
            .register("ping", |_| Ok(json!("pong")))
            .unwrap()
            .register("echo", |request| Ok(request.params.clone()))
            .unwrap()
            .register("fail", |request| {
                Err(JsonRequestError::new(
                    RpcError::new(400, "bad request"),
                    Some(request.clone()),
                )
                .into())
            })
            .unwrap()
            .register("upstream", |_| {
                Err(JsonResponseError::new(RpcError::new(503, "upstream busy")).into())
            })
            .unwrap();
        registry
    }

    #[test]
    fn dispatch_returns_handler_result() {
        let registry = registry();

        let response = registry.dispatch(&RpcRequest::new("ping", Value::Null, 1));
        assert_eq!(response.result, Some(json!("pong")));
        assert_eq!(response.id, 1);

        let response = registry.dispatch(&RpcRequest::new("echo", json!({ "a": 1 }), 2));
        assert_eq!(response.result, Some(json!({ "a": 1 })));
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let response = registry().dispatch(&RpcRequest::new("missing", Value::Null, 4));

        assert_eq!(response.id, 4);
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn handler_errors_become_error_responses() {
        let registry = registry();

        let local = registry.dispatch(&RpcRequest::new("fail", Value::Null, 5));
        assert_eq!(local.error.unwrap().code, 400);

        let remote = registry.dispatch(&RpcRequest::new("upstream", Value::Null, 6));
        let error = remote.error.unwrap();
        assert_eq!(error.code, 503);
        assert_eq!(error.message, "upstream busy");
        assert_eq!(remote.id, 6);
    }

    #[test]
    fn duplicate_and_blank_names_are_rejected() {
        let mut registry = registry();

        assert!(matches!(
            registry.register("ping", |_| Ok(Value::Null)),
            Err(MessagingError::Configuration(_))
        ));
        assert!(registry.register(" ", |_| Ok(Value::Null)).is_err());
        assert_eq!(registry.methods(), vec!["echo", "fail", "ping", "upstream"]);
        assert_eq!(registry.len(), 4);
    }
}
