//! Two-phase access to message headers.
//!
//! An accessor starts mutable, seeded from an optional existing header set
//! (always copied, never shared). [`MessageHeaderAccessor::to_headers`] seals
//! it; every mutation after that fails with [`MessagingError::State`].

use std::mem;

use serde_json::Value;

use crate::core::error::MessagingError;
use crate::core::header::{
    HeaderMap, ID, MESSAGE_METHOD, MESSAGE_TYPE, MessageHeaders, MessageType,
    SEND_MESSAGE_METHOD, SESSION_ID, SUBSCRIBE_METHOD,
};
use crate::core::message::Message;

enum HeaderState {
    Mutable(HeaderMap),
    Sealed(MessageHeaders),
}

/// Builder-side view of a header set
///
/// # Example
///
/// ```ignore
/// let mut accessor = MessageHeaderAccessor::new();
/// accessor.set_message_method("subscribe")?;
/// let headers = accessor.to_headers();
/// assert!(accessor.set_session_id("s-1").is_err());
/// ```
pub struct MessageHeaderAccessor {
    state: HeaderState,
}

impl Default for MessageHeaderAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHeaderAccessor {
    /// Start from an empty header set
    pub fn new() -> Self {
        Self {
            state: HeaderState::Mutable(HeaderMap::new()),
        }
    }

    /// Start from a copy of `headers`; `None` starts empty
    pub fn of_headers(headers: Option<&MessageHeaders>) -> Self {
        Self {
            state: HeaderState::Mutable(headers.map(MessageHeaders::to_map).unwrap_or_default()),
        }
    }

    /// Start from a copy of the headers of `message`
    pub fn of_message<P>(message: &Message<P>) -> Self {
        Self::of_headers(Some(message.headers()))
    }

    /// Wrap an already sealed header set
    pub(crate) fn sealed(headers: MessageHeaders) -> Self {
        Self {
            state: HeaderState::Sealed(headers),
        }
    }

    fn map(&self) -> &HeaderMap {
        match &self.state {
            HeaderState::Mutable(map) => map,
            HeaderState::Sealed(headers) => headers.as_map(),
        }
    }

    fn raw_headers(&mut self) -> Result<&mut HeaderMap, MessagingError> {
        match &mut self.state {
            HeaderState::Mutable(map) => Ok(map),
            HeaderState::Sealed(_) => Err(MessagingError::State(
                "header store already sealed".to_string(),
            )),
        }
    }

    pub fn set_message_type(&mut self, message_type: MessageType) -> Result<(), MessagingError> {
        self.raw_headers()?
            .insert(MESSAGE_TYPE.to_string(), message_type.into());
        Ok(())
    }

    pub fn set_message_method(&mut self, method: impl Into<String>) -> Result<(), MessagingError> {
        self.raw_headers()?
            .insert(MESSAGE_METHOD.to_string(), Value::String(method.into()));
        Ok(())
    }

    pub fn set_send_message_method(
        &mut self,
        method: impl Into<String>,
    ) -> Result<(), MessagingError> {
        self.raw_headers()?
            .insert(SEND_MESSAGE_METHOD.to_string(), Value::String(method.into()));
        Ok(())
    }

    pub fn set_subscribe_name(&mut self, name: impl Into<String>) -> Result<(), MessagingError> {
        self.raw_headers()?
            .insert(SUBSCRIBE_METHOD.to_string(), Value::String(name.into()));
        Ok(())
    }

    pub fn set_session_id(&mut self, session_id: impl Into<String>) -> Result<(), MessagingError> {
        self.raw_headers()?
            .insert(SESSION_ID.to_string(), Value::String(session_id.into()));
        Ok(())
    }

    pub fn set_id(&mut self, id: u64) -> Result<(), MessagingError> {
        self.raw_headers()?.insert(ID.to_string(), Value::from(id));
        Ok(())
    }

    /// Put an arbitrary header
    ///
    /// Reserved keys keep their semantic type: a value of the wrong shape is
    /// rejected with [`MessagingError::Configuration`].
    pub fn put_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), MessagingError> {
        let key = key.into();
        let value = value.into();
        check_reserved(&key, &value)?;
        self.raw_headers()?.insert(key, value);
        Ok(())
    }

    /// Put every entry of `headers`, stopping at the first rejected one
    pub fn put_all<I>(&mut self, headers: I) -> Result<(), MessagingError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in headers {
            self.put_header(key, value)?;
        }
        Ok(())
    }

    pub fn remove_header(&mut self, key: &str) -> Result<Option<Value>, MessagingError> {
        Ok(self.raw_headers()?.remove(key))
    }

    pub fn header(&self, key: &str) -> Option<&Value> {
        self.map().get(key)
    }

    fn header_str(&self, key: &str) -> Option<&str> {
        self.header(key).and_then(Value::as_str)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.header_str(MESSAGE_TYPE).and_then(|s| s.parse().ok())
    }

    /// Destination of the message, `""` when unset
    pub fn message_method(&self) -> &str {
        self.header_str(MESSAGE_METHOD).unwrap_or("")
    }

    pub fn send_message_method(&self) -> Option<&str> {
        self.header_str(SEND_MESSAGE_METHOD)
    }

    pub fn subscribe_method(&self) -> Option<&str> {
        self.header_str(SUBSCRIBE_METHOD)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.header_str(SESSION_ID)
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.state, HeaderState::Sealed(_))
    }

    /// Freeze the header set. Calling it again has no further effect.
    pub fn seal(&mut self) {
        self.to_headers();
    }

    /// Seal (if needed) and hand out the sealed header set
    pub fn to_headers(&mut self) -> MessageHeaders {
        let map = match &mut self.state {
            HeaderState::Sealed(headers) => return headers.clone(),
            HeaderState::Mutable(map) => mem::take(map),
        };

        let headers = MessageHeaders::from_map(map);
        self.state = HeaderState::Sealed(headers.clone());
        headers
    }
}

fn check_reserved(key: &str, value: &Value) -> Result<(), MessagingError> {
    let valid = match key {
        MESSAGE_TYPE => value
            .as_str()
            .is_some_and(|s| s.parse::<MessageType>().is_ok()),
        MESSAGE_METHOD | SEND_MESSAGE_METHOD | SUBSCRIBE_METHOD | SESSION_ID => value.is_string(),
        ID => value.is_u64(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(MessagingError::Configuration(format!(
            "header '{}' cannot hold {}",
            key, value
        )))
    }
}
