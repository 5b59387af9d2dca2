use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::core::channel::MessageChannel;
use crate::core::message::Message;

/// Channel backed by a bounded outbound queue of JSON text frames.
///
/// The payload is encoded and pushed without waiting; a full or closed queue
/// makes the send fail instead of blocking the caller. The receiving side is
/// normally drained by a [`WsDriver`](crate::driver::WsDriver).
#[derive(Clone)]
pub struct QueueChannel {
    outgoing_tx: mpsc::Sender<String>,
}

impl QueueChannel {
    pub fn new(outgoing_tx: mpsc::Sender<String>) -> Self {
        Self { outgoing_tx }
    }

    /// Channel plus the receiving end of its queue
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.outgoing_tx.is_closed()
    }
}

impl<P: Serialize> MessageChannel<P> for QueueChannel {
    fn send(&self, message: &Message<P>) -> bool {
        let method = message.headers().message_method().unwrap_or_default();

        let frame = match serde_json::to_string(message.payload()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode message for {}: {}", method, e);
                return false;
            }
        };

        match self.outgoing_tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full, dropping message for {}", method);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Outbound queue closed, dropping message for {}", method);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use easyrpc_protocol::RpcNotification;
    use serde_json::json;

    use super::*;
    use crate::core::error::MessagingError;
    use crate::core::template::SendingTemplate;

    #[test]
    fn notification_is_queued_as_json_text() {
        let (channel, mut rx) = QueueChannel::bounded(4);
        let template = SendingTemplate::new(channel);

        template.convert_and_send("subscribe", "ok").unwrap();

        let frame = rx.try_recv().unwrap();
        let notification: RpcNotification = serde_json::from_str(&frame).unwrap();
        assert_eq!(notification.method, "subscribe");
        assert_eq!(notification.params, json!("ok"));
    }

    #[test]
    fn full_queue_fails_the_send() {
        let (channel, _rx) = QueueChannel::bounded(1);
        let template = SendingTemplate::new(channel);

        template.convert_and_send("a", &1).unwrap();
        let err = template.convert_and_send("a", &2).unwrap_err();

        assert!(matches!(err, MessagingError::Dispatch(_)));
    }

    #[test]
    fn closed_queue_fails_the_send() {
        let (channel, rx) = QueueChannel::bounded(4);
        drop(rx);

        assert!(channel.is_closed());
        let err = SendingTemplate::new(channel)
            .convert_and_send("a", "late")
            .unwrap_err();
        assert!(matches!(err, MessagingError::Dispatch(_)));
    }
}
