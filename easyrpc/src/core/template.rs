//! Outbound send pipeline.
//!
//! [`SendingTemplate`] validates, converts and hands messages to its
//! [`MessageChannel`]. Every call builds its own headers and envelope and runs
//! to completion on the calling thread; the template keeps no state between
//! calls.

use std::fmt::Debug;
use std::sync::Arc;

use easyrpc_protocol::RpcNotification;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::accessor::MessageHeaderAccessor;
use crate::core::channel::MessageChannel;
use crate::core::converter::{JsonRpcMessageConverter, MessageConverter};
use crate::core::error::{DispatchError, MessagingError};
use crate::core::header::{HeaderMap, ID, MessageHeaders, MessageType};
use crate::core::message::{Message, MessageBuilder};
use crate::core::observability::{
    MESSAGES_FAILED_TOTAL, MESSAGES_SENT_TOTAL, MetricsSink, NoopMetrics,
};

/// Last-moment hook applied to a converted message before it is sent.
///
/// The returned message is the one that gets sent.
pub trait MessagePostProcessor<P> {
    fn post_process_message(&self, message: Message<P>) -> Message<P>;
}

impl<P, F> MessagePostProcessor<P> for F
where
    F: Fn(Message<P>) -> Message<P>,
{
    fn post_process_message(&self, message: Message<P>) -> Message<P> {
        self(message)
    }
}

/// Send pipeline over a channel `C`
pub struct SendingTemplate<C> {
    channel: C,
    converter: JsonRpcMessageConverter,
    metrics: Arc<dyn MetricsSink>,
}

impl<C> SendingTemplate<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            converter: JsonRpcMessageConverter::new(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn converter(&self) -> &JsonRpcMessageConverter {
        &self.converter
    }

    /// Send a message that already names its destination in the
    /// `messageMethod` header.
    ///
    /// # Errors
    ///
    /// - [`MessagingError::Configuration`] if the method header is missing or blank
    /// - [`MessagingError::Dispatch`] if the channel refuses the message
    pub fn send<P>(&self, message: Message<P>) -> Result<(), MessagingError>
    where
        C: MessageChannel<P>,
        P: Serialize + Debug,
    {
        self.do_send(message)
    }

    /// Send `message` to `destination`, recording it in both method headers
    pub fn send_to<P>(&self, destination: &str, message: Message<P>) -> Result<(), MessagingError>
    where
        C: MessageChannel<P>,
        P: Serialize + Debug,
    {
        let mut accessor = MessageHeaderAccessor::of_message(&message);
        accessor.set_message_method(destination)?;
        accessor.set_send_message_method(destination)?;
        let headers = accessor.to_headers();

        let message = MessageBuilder::from_message(message)
            .with_headers(headers)
            .build();
        self.do_send(message)
    }

    /// Convert `payload` into a notification and send it to `destination`
    pub fn convert_and_send<T>(&self, destination: &str, payload: &T) -> Result<(), MessagingError>
    where
        C: MessageChannel<RpcNotification>,
        T: Serialize + ?Sized,
    {
        self.convert_and_send_with(destination, payload, None, None)
    }

    /// [`convert_and_send`](Self::convert_and_send) with extra headers
    pub fn convert_and_send_with_headers<T>(
        &self,
        destination: &str,
        payload: &T,
        headers: HeaderMap,
    ) -> Result<(), MessagingError>
    where
        C: MessageChannel<RpcNotification>,
        T: Serialize + ?Sized,
    {
        self.convert_and_send_with(destination, payload, Some(headers), None)
    }

    /// [`convert_and_send`](Self::convert_and_send) with a post-processor
    pub fn convert_and_send_with_post_processor<T, F>(
        &self,
        destination: &str,
        payload: &T,
        post_processor: F,
    ) -> Result<(), MessagingError>
    where
        C: MessageChannel<RpcNotification>,
        T: Serialize + ?Sized,
        F: Fn(Message<RpcNotification>) -> Message<RpcNotification>,
    {
        self.convert_and_send_with(destination, payload, None, Some(&post_processor))
    }

    /// Full form of the convert-and-send family.
    ///
    /// The destination is checked before anything else happens. Headers are
    /// tagged `NOTIFICATION` and never carry a correlation id, whatever the
    /// caller passed in `headers`.
    pub fn convert_and_send_with<T>(
        &self,
        destination: &str,
        payload: &T,
        headers: Option<HeaderMap>,
        post_processor: Option<&dyn MessagePostProcessor<RpcNotification>>,
    ) -> Result<(), MessagingError>
    where
        C: MessageChannel<RpcNotification>,
        T: Serialize + ?Sized,
    {
        require_destination(destination)?;

        let mut accessor = MessageHeaderAccessor::new();
        if let Some(headers) = headers {
            accessor.put_all(headers)?;
        }
        accessor.set_message_type(MessageType::Notification)?;
        accessor.remove_header(ID)?;

        let message = self.do_convert(destination, payload, accessor.to_headers(), post_processor)?;
        self.send_to(destination, message)
    }

    fn do_convert<T>(
        &self,
        destination: &str,
        payload: &T,
        headers: MessageHeaders,
        post_processor: Option<&dyn MessagePostProcessor<RpcNotification>>,
    ) -> Result<Message<RpcNotification>, MessagingError>
    where
        T: Serialize + ?Sized,
    {
        let message = self.converter.to_message(payload, headers, destination)?;
        Ok(match post_processor {
            Some(post_processor) => post_processor.post_process_message(message),
            None => message,
        })
    }

    fn do_send<P>(&self, message: Message<P>) -> Result<(), MessagingError>
    where
        C: MessageChannel<P>,
        P: Serialize + Debug,
    {
        let method = match message.headers().message_method() {
            Some(method) if !method.trim().is_empty() => method.to_string(),
            _ => {
                return Err(MessagingError::Configuration(
                    "message method is required".to_string(),
                ));
            }
        };

        if !self.channel.send(&message) {
            warn!("Channel refused message for destination {}", method);
            self.metrics
                .incr_counter(MESSAGES_FAILED_TOTAL, 1, &[("destination", method.as_str())]);
            return Err(DispatchError::new(method, message.to_json_message_lossy()).into());
        }

        debug!("Send message, messageMethod = {}, message = {:?}", method, message);
        self.metrics
            .incr_counter(MESSAGES_SENT_TOTAL, 1, &[("destination", method.as_str())]);
        Ok(())
    }
}

fn require_destination(destination: &str) -> Result<(), MessagingError> {
    if destination.trim().is_empty() {
        return Err(MessagingError::Configuration(
            "destination is required".to_string(),
        ));
    }
    Ok(())
}
