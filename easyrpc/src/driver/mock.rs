use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::core::channel::MessageChannel;
use crate::core::message::Message;

/// In-memory channel for tests.
///
/// Records every message it is handed and answers with a switchable verdict.
/// Rejected messages are recorded too, so callers can count attempts.
pub struct RecordingChannel<P> {
    accept: AtomicBool,
    sent: Mutex<Vec<Message<P>>>,
}

impl<P> Default for RecordingChannel<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RecordingChannel<P> {
    /// A channel that accepts everything
    pub fn new() -> Self {
        Self {
            accept: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A channel that refuses everything
    pub fn rejecting() -> Self {
        let channel = Self::new();
        channel.set_accept(false);
        channel
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Number of send attempts seen so far
    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl<P: Clone> RecordingChannel<P> {
    pub fn sent(&self) -> Vec<Message<P>> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<Message<P>> {
        self.sent.lock().last().cloned()
    }
}

impl<P> MessageChannel<P> for RecordingChannel<P>
where
    P: Clone + Send + Sync,
{
    fn send(&self, message: &Message<P>) -> bool {
        self.sent.lock().push(message.clone());
        self.accept.load(Ordering::SeqCst)
    }
}
