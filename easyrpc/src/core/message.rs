use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::accessor::MessageHeaderAccessor;
use crate::core::error::MessagingError;
use crate::core::header::MessageHeaders;

/// A payload paired with sealed headers
///
/// Built only through [`MessageBuilder`]; there is no way to change a message
/// afterwards, only to derive a new one from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<P = Value> {
    payload: P,
    headers: MessageHeaders,
}

impl<P> Message<P> {
    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    #[inline]
    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn into_parts(self) -> (P, MessageHeaders) {
        (self.payload, self.headers)
    }

    /// Replace the payload, keeping the headers
    pub fn map_payload<Q>(self, f: impl FnOnce(P) -> Q) -> Message<Q> {
        Message {
            payload: f(self.payload),
            headers: self.headers,
        }
    }
}

impl<P: Serialize> Message<P> {
    /// Same message with the payload lowered to a JSON value
    pub fn to_json_message(&self) -> Result<Message<Value>, serde_json::Error> {
        Ok(Message {
            payload: serde_json::to_value(&self.payload)?,
            headers: self.headers.clone(),
        })
    }
}

impl<P: Serialize + fmt::Debug> Message<P> {
    /// Like [`Message::to_json_message`], but a payload with no JSON form is
    /// kept as its `Debug` rendering instead of failing
    pub fn to_json_message_lossy(&self) -> Message<Value> {
        let payload = serde_json::to_value(&self.payload)
            .unwrap_or_else(|_| Value::String(format!("{:?}", self.payload)));
        Message {
            payload,
            headers: self.headers.clone(),
        }
    }
}

/// Builder for [`Message`]
///
/// # Example
///
/// ```ignore
/// let message = MessageBuilder::from_payload("foo")
///     .header("foo", "bar")?
///     .build();
/// let derived = MessageBuilder::from_message(message)
///     .with_payload(42)
///     .build();
/// ```
pub struct MessageBuilder<P> {
    payload: P,
    headers: MessageHeaderAccessor,
}

impl<P> MessageBuilder<P> {
    /// Start a message with empty headers
    pub fn from_payload(payload: P) -> Self {
        Self {
            payload,
            headers: MessageHeaderAccessor::new(),
        }
    }

    /// Start from an existing message, with a private copy of its headers
    pub fn from_message(message: Message<P>) -> Self {
        let (payload, headers) = message.into_parts();
        Self {
            payload,
            headers: MessageHeaderAccessor::of_headers(Some(&headers)),
        }
    }

    /// Use `headers` as they are. They are already sealed, so later calls
    /// to [`MessageBuilder::header`] fail.
    pub fn with_headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = MessageHeaderAccessor::sealed(headers);
        self
    }

    /// Swap the payload, keeping the working headers
    pub fn with_payload<Q>(self, payload: Q) -> MessageBuilder<Q> {
        MessageBuilder {
            payload,
            headers: self.headers,
        }
    }

    pub fn header(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, MessagingError> {
        self.headers.put_header(key, value)?;
        Ok(self)
    }

    pub fn headers_mut(&mut self) -> &mut MessageHeaderAccessor {
        &mut self.headers
    }

    /// Seal the headers and produce the message
    pub fn build(mut self) -> Message<P> {
        Message {
            headers: self.headers.to_headers(),
            payload: self.payload,
        }
    }
}
