//! Message headers.
//!
//! [`MessageHeaders`] is the sealed, read-only form of a header set. It is
//! produced by [`MessageHeaderAccessor`](crate::core::accessor::MessageHeaderAccessor)
//! and shared freely between readers once built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

/// Message intent (`REQUEST | RESPONSE | NOTIFICATION | ERROR`)
pub const MESSAGE_TYPE: &str = "messageType";
/// Destination the message is addressed to
pub const MESSAGE_METHOD: &str = "messageMethod";
/// Destination recorded by a destination-qualified send
pub const SEND_MESSAGE_METHOD: &str = "sendMessageMethod";
/// Subscription the message belongs to
pub const SUBSCRIBE_METHOD: &str = "subscribeMethodName";
/// Session id for message
pub const SESSION_ID: &str = "sessionId";
/// Correlation id. Absent on notifications.
pub const ID: &str = "id";

/// Raw header storage
pub type HeaderMap = BTreeMap<String, Value>;

/// Message type tag carried in the [`MESSAGE_TYPE`] header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Request,
    Response,
    Notification,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
            Self::Notification => "NOTIFICATION",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(Self::Request),
            "RESPONSE" => Ok(Self::Response),
            "NOTIFICATION" => Ok(Self::Notification),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown message type '{}'", other)),
        }
    }
}

impl From<MessageType> for Value {
    fn from(message_type: MessageType) -> Self {
        Value::String(message_type.as_str().to_string())
    }
}

/// Sealed message headers
///
/// Immutable once constructed. Cloning only bumps a reference count, so a
/// header set can be handed to any number of readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeaders {
    inner: Arc<HeaderMap>,
}

impl MessageHeaders {
    /// Empty header set
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(map: HeaderMap) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }

    pub(crate) fn as_map(&self) -> &HeaderMap {
        &self.inner
    }

    /// Copy of the underlying map, detached from this header set
    pub fn to_map(&self) -> HeaderMap {
        self.inner.as_ref().clone()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.get_str(MESSAGE_TYPE).and_then(|s| s.parse().ok())
    }

    pub fn message_method(&self) -> Option<&str> {
        self.get_str(MESSAGE_METHOD)
    }

    pub fn send_message_method(&self) -> Option<&str> {
        self.get_str(SEND_MESSAGE_METHOD)
    }

    pub fn subscribe_method(&self) -> Option<&str> {
        self.get_str(SUBSCRIBE_METHOD)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get_str(SESSION_ID)
    }

    /// Correlation id, `None` for notifications
    pub fn id(&self) -> Option<u64> {
        self.inner.get(ID).and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_type_parses_its_own_tag() {
        for message_type in [
            MessageType::Request,
            MessageType::Response,
            MessageType::Notification,
            MessageType::Error,
        ] {
            assert_eq!(message_type.as_str().parse::<MessageType>(), Ok(message_type));
        }
        assert!("notification".parse::<MessageType>().is_err());
    }

    #[test]
    fn typed_readers_ignore_missing_and_mistyped_values() {
        let mut map = HeaderMap::new();
        map.insert(MESSAGE_METHOD.to_string(), json!("subscribe"));
        map.insert(SESSION_ID.to_string(), json!(42));
        map.insert(MESSAGE_TYPE.to_string(), json!("NOTIFICATION"));
        let headers = MessageHeaders::from_map(map);

        assert_eq!(headers.message_method(), Some("subscribe"));
        assert_eq!(headers.message_type(), Some(MessageType::Notification));
        assert_eq!(headers.session_id(), None);
        assert_eq!(headers.send_message_method(), None);
        assert_eq!(headers.id(), None);
    }

    #[test]
    fn clones_share_storage() {
        let headers = MessageHeaders::from_map(HeaderMap::from([("foo".to_string(), json!("bar"))]));
        let clone = headers.clone();

        assert!(Arc::ptr_eq(&headers.inner, &clone.inner));
        assert_eq!(clone.keys().collect::<Vec<_>>(), vec!["foo"]);
    }
}
